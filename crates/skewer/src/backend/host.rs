//! Plain-vector backend.
//!
//! Token sequences are `Vec<u32>`, batches are `Vec<Vec<u32>>` and logits are
//! a row-major [`HostLogits`] buffer. Useful for models that already run on
//! the host, and for exercising the scorer without a tensor library.
use super::{LogitsTensor, TokenTensor};
use crate::error::{Error, Result};

impl TokenTensor for Vec<u32> {
    type Device = ();
    type Stacked = Vec<Vec<u32>>;

    fn from_ids(ids: &[u32], _device: &Self::Device) -> Result<Self> {
        Ok(ids.to_vec())
    }

    fn seq_len(&self) -> usize {
        self.len()
    }

    fn cat(tensors: &[Self]) -> Result<Self> {
        Ok(tensors.concat())
    }

    fn stack(tensors: &[Self]) -> Result<Self::Stacked> {
        if let Some(first) = tensors.first() {
            if let Some(bad) = tensors.iter().find(|t| t.len() != first.len()) {
                return Err(Error::Backend(format!(
                    "cannot stack sequences of length {} and {}", first.len(), bad.len()
                )));
            }
        }
        Ok(tensors.to_vec())
    }

    fn stacked_shape(stacked: &Self::Stacked) -> Vec<usize> {
        vec![stacked.len(), stacked.first().map_or(0, Vec::len)]
    }
}

/// Row-major `(batch, seq, vocab)` buffer of scores.
#[derive(Clone, Debug, PartialEq)]
pub struct HostLogits {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl HostLogits {
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::Backend(format!(
                "logits buffer holds {} values, shape {:?} needs {}", data.len(), shape, expected
            )));
        }
        Ok(Self { shape, data })
    }

    /// Scores for one `(batch, position)` pair; callers check bounds
    pub(crate) fn position(&self, batch_index: usize, position: usize) -> &[f32] {
        let [_, seq, vocab] = self.shape;
        let start = (batch_index * seq + position) * vocab;
        &self.data[start..start + vocab]
    }
}

impl LogitsTensor for HostLogits {
    fn shape(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    fn log_softmax(&self) -> Result<Self> {
        let vocab = self.shape[2];
        let mut data = Vec::with_capacity(self.data.len());
        if vocab > 0 {
            for row in self.data.chunks(vocab) {
                let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let sum_exp: f64 = row.iter().map(|&x| ((x - max) as f64).exp()).sum();
                let log_sum_exp = max as f64 + sum_exp.ln();
                data.extend(row.iter().map(|&x| (x as f64 - log_sum_exp) as f32));
            }
        }
        Ok(Self { shape: self.shape, data })
    }

    fn rows(&self, batch_index: usize, start: usize, len: usize) -> Result<Vec<Vec<f32>>> {
        let [batch, seq, _] = self.shape;
        if batch_index >= batch || start + len > seq {
            return Err(Error::Backend(format!(
                "rows {}..{} of member {} out of bounds for shape {:?}",
                start, start + len, batch_index, self.shape
            )));
        }
        Ok((start..start + len)
            .map(|p| self.position(batch_index, p).to_vec())
            .collect())
    }
}
