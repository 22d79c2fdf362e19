//! Error types for skewer

use thiserror::Error;

/// Result type alias using skewer's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scoring, generation and configuration.
///
/// Precondition violations (`EmptyContext`, `EmptyContinuation`,
/// `ContinuationTooLong`, `InvalidGenerationKwargs`, `ContextTooLong`) signal a
/// caller or configuration bug and are never retried. `LengthMismatch` is an
/// internal invariant violation raised when reordered results cannot be
/// restored.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request context must contain at least one token")]
    EmptyContext,

    #[error("request continuation must contain at least one token")]
    EmptyContinuation,

    #[error("continuation of {len} tokens exceeds the model context window of {max_length}")]
    ContinuationTooLong { len: usize, max_length: usize },

    #[error("cannot restore order: expected {expected} results, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("invalid generation kwargs: {0}")]
    InvalidGenerationKwargs(String),

    #[error("max_gen_toks {max_gen_toks} leaves no room for context in a window of {max_length}")]
    ContextTooLong { max_gen_toks: usize, max_length: usize },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(feature = "candle")]
impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
