//! Requests handed to the scorer and the generation path, and their results.

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Opaque identity of a string-level request, kept for result caching by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub context: String,
    pub continuation: String,
}

/// One `(context, continuation)` token pair to score.
///
/// Both sequences are non-empty; this is checked on construction. The
/// continuation-versus-window check needs the model's context length and is
/// made by the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    cache_key: Option<CacheKey>,
    context_tokens: Vec<u32>,
    continuation_tokens: Vec<u32>,
}

impl Request {
    pub fn new(
        cache_key: Option<CacheKey>,
        context_tokens: Vec<u32>,
        continuation_tokens: Vec<u32>,
    ) -> Result<Self> {
        if context_tokens.is_empty() {
            return Err(Error::EmptyContext);
        }
        if continuation_tokens.is_empty() {
            return Err(Error::EmptyContinuation);
        }
        Ok(Self { cache_key, context_tokens, continuation_tokens })
    }

    pub fn cache_key(&self) -> Option<&CacheKey> {
        self.cache_key.as_ref()
    }

    pub fn context_tokens(&self) -> &[u32] {
        &self.context_tokens
    }

    pub fn continuation_tokens(&self) -> &[u32] {
        &self.continuation_tokens
    }

    /// Combined length of context and continuation
    pub fn total_len(&self) -> usize {
        self.context_tokens.len() + self.continuation_tokens.len()
    }

    /// Context followed by continuation
    pub fn tokens(&self) -> Vec<u32> {
        [self.context_tokens.as_slice(), self.continuation_tokens.as_slice()].concat()
    }
}

/// Outcome of scoring one [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Sum of the log-probabilities of the continuation tokens given the context
    pub log_probability: f64,

    /// Whether arg-max decoding reproduces the continuation token for token
    pub is_greedy_match: bool,
}

/// A free-text generation request.
///
/// `gen_kwargs` must be a JSON object. Recognized keys are `until` (a string
/// or a list of strings) and `max_gen_toks`; every other key is forwarded to
/// the model's `generate` as a sampling option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub context: String,
    pub gen_kwargs: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(context: impl Into<String>, gen_kwargs: serde_json::Value) -> Self {
        Self { context: context.into(), gen_kwargs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_context() {
        let err = Request::new(None, vec![], vec![1]).unwrap_err();
        assert!(matches!(err, Error::EmptyContext));
    }

    #[test]
    fn test_rejects_empty_continuation() {
        let err = Request::new(None, vec![1], vec![]).unwrap_err();
        assert!(matches!(err, Error::EmptyContinuation));
    }

    #[test]
    fn test_tokens_concatenates() {
        let request = Request::new(None, vec![1, 2], vec![3]).unwrap();
        assert_eq!(request.tokens(), vec![1, 2, 3]);
        assert_eq!(request.total_len(), 3);
    }
}
