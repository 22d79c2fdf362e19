use std::fmt::Debug;
use crate::error::Result;


/// A rank-1 sequence of token ids that can be padded and stacked into a batch.
///
/// The scorer never looks inside a token tensor; it only concatenates
/// sequences along the sequence dimension and stacks equal-length sequences
/// along a new batch dimension.
pub trait TokenTensor: Debug + Clone + Send + Sync + 'static {
    /// Where freshly built tensors are allocated
    type Device: Debug + Clone + Send + Sync;

    /// The `(batch, seq)` tensor produced by [`TokenTensor::stack`]
    type Stacked: Debug + Clone + Send + Sync + 'static;

    /// Build a sequence from host token ids
    fn from_ids(ids: &[u32], device: &Self::Device) -> Result<Self>;

    /// Number of tokens in the sequence
    fn seq_len(&self) -> usize;

    /// Concatenate sequences end to end, in the order supplied
    fn cat(tensors: &[Self]) -> Result<Self>;

    /// Stack equal-length sequences along a new leading batch dimension
    fn stack(tensors: &[Self]) -> Result<Self::Stacked>;

    /// Return the `(batch, seq)` shape of a stacked tensor
    fn stacked_shape(stacked: &Self::Stacked) -> Vec<usize>;
}

/// Model output of shape `(batch, seq, vocab)`.
pub trait LogitsTensor: Debug + Clone + Send + Sync + 'static {
    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Normalize along the vocabulary dimension into log-probabilities
    fn log_softmax(&self) -> Result<Self>;

    /// Copy rows `start..start + len` of batch member `batch_index` to the host,
    /// one `vocab`-long vector per position
    fn rows(&self, batch_index: usize, start: usize, len: usize) -> Result<Vec<Vec<f32>>>;
}
