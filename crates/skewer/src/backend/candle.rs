use super::{LogitsTensor, TokenTensor};
use crate::constant::BATCH_DIM;
use crate::error::{Error, Result};
use candle_core::{DType, Device, Tensor, D};

impl TokenTensor for Tensor {
    type Device = Device;
    type Stacked = Tensor;

    fn from_ids(ids: &[u32], device: &Self::Device) -> Result<Self> {
        Ok(Tensor::new(ids, device)?)
    }

    fn seq_len(&self) -> usize {
        self.dims().first().copied().unwrap_or(0)
    }

    fn cat(tensors: &[Self]) -> Result<Self> {
        Ok(Tensor::cat(tensors, 0)?)
    }

    fn stack(tensors: &[Self]) -> Result<Self::Stacked> {
        Ok(Tensor::stack(tensors, BATCH_DIM)?)
    }

    fn stacked_shape(stacked: &Self::Stacked) -> Vec<usize> {
        stacked.dims().to_vec()
    }
}

impl LogitsTensor for Tensor {
    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn log_softmax(&self) -> Result<Self> {
        let logits = self.to_dtype(DType::F32)?;
        let max = logits.max_keepdim(D::Minus1)?;
        let shifted = logits.broadcast_sub(&max)?;
        let log_sum_exp = shifted.exp()?.sum_keepdim(D::Minus1)?.log()?;
        Ok(shifted.broadcast_sub(&log_sum_exp)?)
    }

    fn rows(&self, batch_index: usize, start: usize, len: usize) -> Result<Vec<Vec<f32>>> {
        let dims = self.dims();
        if dims.len() != 3 {
            return Err(Error::Backend(format!("expected (batch, seq, vocab) logits, got {:?}", dims)));
        }
        // `get` drops the batch dimension, so positions are now dimension 0
        let member = self.get(batch_index)?;
        let window = member.narrow(0, start, len)?;
        Ok(window.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}
