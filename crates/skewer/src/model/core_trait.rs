use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::backend::{LogitsTensor, TokenTensor};
use crate::error::Result;

/// # Tokenizer
///
/// Converts between text and token ids. `encode` must not add special tokens;
/// the evaluator inserts the end-of-text token itself where one is needed.
pub trait Tokenizer: Send + Sync {
    /// Encode text to token ids, without special tokens
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids to text
    fn decode(&self, tokens: &[u32]) -> Result<String>;

    /// Size of the vocabulary, excluding added tokens
    fn vocab_size(&self) -> usize;

    /// Token marking the end of a text; used as empty context, rolling prefix
    /// and default generation stop
    fn eot_token_id(&self) -> u32;

    /// The token id `text` encodes to, when it encodes to exactly one token
    fn single_token(&self, text: &str) -> Result<Option<u32>> {
        let tokens = self.encode(text)?;
        Ok(match tokens.as_slice() {
            [token] => Some(*token),
            _ => None,
        })
    }

    /// Whether `text` encodes to exactly one token
    fn encode_returns_single_token(&self, text: &str) -> Result<bool> {
        Ok(self.single_token(text)?.is_some())
    }
}

/// Sampling options forwarded to [`CausalModel::generate`].
///
/// Decoding is greedy unless `do_sample` is set explicitly. Keys the
/// evaluator does not interpret itself (`temperature`, `top_k`, ...) travel
/// in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub do_sample: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// # CausalModel
///
/// A sequence model scored by the evaluator.
///
/// ## Input/Output Dimensions
///
/// `forward` receives a `(batch, seq)` tensor of token ids, right padded, and
/// returns `(batch, seq, vocab)` unnormalized scores: position `i` holds the
/// prediction for the token at `i + 1`. The evaluator applies the log-softmax.
///
/// ## Implementation Notes
///
/// - Inference is read-only; implementations must not mutate weights
/// - Errors such as resource exhaustion are returned as-is and are not retried
/// - Single-device and data-parallel implementations expose the same interface;
///   the choice is made when the evaluator is constructed
#[async_trait]
pub trait CausalModel<T>: Send + Sync where T: TokenTensor
{
    /// The logits tensor returned by [`CausalModel::forward`]
    type Logits: LogitsTensor;

    /// Device that input batches are allocated on
    fn device(&self) -> &T::Device;

    /// Longest sequence the model attends over
    fn max_length(&self) -> usize;

    /// Score every position of every sequence in the batch.
    async fn forward(&self, batch: T::Stacked) -> Result<Self::Logits>;

    /// Decode autoregressively from `context` until every sequence produces
    /// `eos_token_id` or reaches `max_length` tokens in total.
    ///
    /// # Returns
    ///
    /// One token list per batch member, context included.
    async fn generate(
        &self,
        context: T::Stacked,
        max_length: usize,
        eos_token_id: u32,
        options: &GenerationOptions,
    ) -> Result<Vec<Vec<u32>>>;
}
