//! # Batch Scorer
//!
//! Computes `(log_probability, is_greedy_match)` for many `(context,
//! continuation)` requests with as few model calls as possible.
//!
//! ## Algorithm
//!
//! 1. Requests are sorted longest first (ties broken by token content)
//! 2. The sorted list is cut into chunks of at most `batch_size`
//! 3. Each member becomes `(context + continuation)`, left-truncated to
//!    `max_length + 1` tokens with the final token dropped
//! 4. Members are right padded to the first (longest) member's length and stacked
//! 5. One forward pass per chunk; log-softmax over the vocabulary
//! 6. The `len(continuation)` positions ending at each member's input length
//!    are the continuation's predictions and are scored on the host
//! 7. Results are restored to caller order
//!
//! Contexts too long for the window lose their oldest tokens silently. This
//! cropping is intended behavior, logged at `debug` level only.

use std::cmp::Reverse;
use std::marker::PhantomData;
use tracing::{debug, info, instrument, trace};
use crate::backend::{LogitsTensor, TokenTensor};
use crate::error::{Error, Result};
use crate::model::CausalModel;
use crate::reorder::Reorderer;
use crate::request::{Request, ScoreResult};
use crate::tensor::operations::{continuation_score, model_input_ids, pad_single_sequence};

/// A padded, stacked chunk of requests ready for one forward pass.
#[derive(Debug, Clone)]
pub struct Batch<T>
where T: TokenTensor
{
    /// `(batch, padding_length)` token ids
    pub inputs: T::Stacked,

    /// Unpadded model input length of each member
    pub input_lengths: Vec<usize>,

    /// Sequence length every member is padded to, the first member's input length
    pub padding_length: usize,
}

/// Scores requests in fixed-size batches against a [`CausalModel`].
#[derive(Debug, Clone)]
pub struct BatchScorer<T> {
    batch_size: usize,
    max_length: usize,
    padding_token_id: u32,
    report_progress: bool,
    _marker: PhantomData<T>,
}

impl<T> BatchScorer<T>
where T: TokenTensor
{
    pub fn new(batch_size: usize, max_length: usize, padding_token_id: u32) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_length,
            padding_token_id,
            report_progress: true,
            _marker: PhantomData,
        }
    }

    /// Whether per-batch progress is logged at `info` rather than `trace`
    pub fn with_progress(mut self, report_progress: bool) -> Self {
        self.report_progress = report_progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Score `requests`, returning one result per request in caller order.
    ///
    /// Fails before any model call if a continuation is longer than the
    /// model's window. Model errors end the run and are returned unchanged.
    #[instrument(skip_all, fields(requests = requests.len(), batch_size = self.batch_size))]
    pub async fn score<M>(&self, model: &M, requests: Vec<Request>) -> Result<Vec<ScoreResult>>
    where M: CausalModel<T> + ?Sized
    {
        for request in &requests {
            let len = request.continuation_tokens().len();
            if len > self.max_length {
                return Err(Error::ContinuationTooLong { len, max_length: self.max_length });
            }
        }

        // longest first: the first member of a chunk sets its padding length,
        // and the most expensive chunk runs before any other
        let re_ord = Reorderer::new(requests, |r| (Reverse(r.total_len()), r.tokens()));
        let total_batches = re_ord.len().div_ceil(self.batch_size);
        let mut results = Vec::with_capacity(re_ord.len());

        for (index, chunk) in re_ord.reordered().chunks(self.batch_size).enumerate() {
            let batch = self.build_batch(model.device(), chunk)?;
            debug!(batch = index, shape = ?T::stacked_shape(&batch.inputs), "scoring batch");

            let logits = model.forward(batch.inputs).await?.log_softmax()?;
            match logits.shape().as_slice() {
                [b, s, _] if *b == chunk.len() && *s == batch.padding_length => {}
                shape => {
                    return Err(Error::Backend(format!(
                        "expected ({}, {}, vocab) logits but the model returned {:?}",
                        chunk.len(), batch.padding_length, shape
                    )));
                }
            }
            for (member, (request, &input_length)) in chunk.iter().zip(&batch.input_lengths).enumerate() {
                let continuation = request.continuation_tokens();
                let rows = logits.rows(member, input_length - continuation.len(), continuation.len())?;
                results.push(continuation_score(&rows, continuation)?);
            }

            if self.report_progress {
                info!(batch = index + 1, total = total_batches, "scored batch");
            } else {
                trace!(batch = index + 1, total = total_batches, "scored batch");
            }
        }

        re_ord.restore(results)
    }

    /// Truncate, pad and stack one chunk of requests.
    ///
    /// Members must already be sorted longest first.
    pub fn build_batch(&self, device: &T::Device, members: &[Request]) -> Result<Batch<T>> {
        let mut sequences = Vec::with_capacity(members.len());
        let mut input_lengths = Vec::with_capacity(members.len());
        let mut padding_length = None;

        for request in members {
            if request.total_len() > self.max_length + 1 {
                debug!(
                    dropped = request.total_len() - self.max_length - 1,
                    "context longer than the model window, truncating from the left"
                );
            }
            let ids = model_input_ids(request.context_tokens(), request.continuation_tokens(), self.max_length);
            let sequence = T::from_ids(&ids, device)?;
            let input_length = sequence.seq_len();
            let padding_length = *padding_length.get_or_insert(input_length);

            let padded = pad_single_sequence(
                &sequence,
                padding_length.saturating_sub(input_length),
                self.padding_token_id,
                device,
            )?;
            sequences.push(padded);
            input_lengths.push(input_length);
        }

        Ok(Batch {
            inputs: T::stack(&sequences)?,
            input_lengths,
            padding_length: padding_length.unwrap_or(0),
        })
    }
}
