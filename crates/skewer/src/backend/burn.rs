//! The burn implementation for backend provision.
//! Burn tensors carry their rank as a const generic, so token sequences,
//! stacked batches and logits are three distinct tensor types.
use super::{LogitsTensor, TokenTensor};
use crate::constant::{BATCH_DIM, SEQ_DIM, VOCAB_DIM};
use crate::error::{Error, Result};
use burn::prelude::{Backend as BurnBackend, Int, Tensor};
use burn::tensor::{activation, TensorData};

impl<B> TokenTensor for Tensor<B, 1, Int>
where B: BurnBackend
{
    type Device = B::Device;
    type Stacked = Tensor<B, 2, Int>;

    fn from_ids(ids: &[u32], device: &Self::Device) -> Result<Self> {
        let values: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        let data = TensorData::new(values, [ids.len()]);
        Ok(Tensor::<B, 1, Int>::from_data(data, device))
    }

    fn seq_len(&self) -> usize {
        self.dims()[0]
    }

    fn cat(tensors: &[Self]) -> Result<Self> {
        let owned: Vec<_> = tensors.to_vec();
        Ok(Tensor::cat(owned, 0))
    }

    fn stack(tensors: &[Self]) -> Result<Self::Stacked> {
        let owned: Vec<_> = tensors.to_vec();
        Ok(Tensor::stack::<2>(owned, BATCH_DIM))
    }

    fn stacked_shape(stacked: &Self::Stacked) -> Vec<usize> {
        stacked.dims().to_vec()
    }
}

impl<B> LogitsTensor for Tensor<B, 3>
where B: BurnBackend
{
    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn log_softmax(&self) -> Result<Self> {
        Ok(activation::log_softmax(self.clone(), VOCAB_DIM))
    }

    fn rows(&self, batch_index: usize, start: usize, len: usize) -> Result<Vec<Vec<f32>>> {
        let dims = self.dims();
        let vocab = dims[VOCAB_DIM];
        if batch_index >= dims[BATCH_DIM] || start + len > dims[SEQ_DIM] {
            return Err(Error::Backend(format!(
                "rows {}..{} of member {} out of bounds for shape {:?}",
                start, start + len, batch_index, dims
            )));
        }
        let window = self
            .clone()
            .slice([batch_index..batch_index + 1, start..start + len, 0..vocab]);
        let values = window
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::Backend(format!("{:?}", e)))?;
        if vocab == 0 {
            return Ok(vec![Vec::new(); len]);
        }
        Ok(values.chunks(vocab).map(<[f32]>::to_vec).collect())
    }
}
