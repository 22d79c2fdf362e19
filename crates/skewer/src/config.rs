//! Evaluator configuration.
//!
//! Settings may be built in code, or loaded from TOML / JSON:
//!
//! ```toml
//! batch_size = 8
//! max_length = 2048
//! max_gen_toks = 256
//! padding_token_id = 0
//! do_sample = false
//! ```
//!
//! Every field is optional; missing fields take the defaults shown by
//! [`EvaluatorConfig::default`].

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Default number of tokens generated by `greedy_until` when a request does not say otherwise.
pub const DEFAULT_MAX_GEN_TOKS: usize = 256;

/// Runtime settings shared by the scoring and generation paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Number of requests stacked into one forward pass.
    pub batch_size: usize,

    /// Overrides the model's own context window when set.
    pub max_length: Option<usize>,

    /// Generation budget for `greedy_until` requests without a `max_gen_toks` kwarg.
    pub max_gen_toks: usize,

    /// Filler token id used for right padding inside a batch.
    pub padding_token_id: u32,

    /// Default sampling mode passed to `generate`; greedy unless set.
    pub do_sample: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            max_length: None,
            max_gen_toks: DEFAULT_MAX_GEN_TOKS,
            padding_token_id: 0,
            do_sample: false,
        }
    }
}

impl EvaluatorConfig {
    /// Parse and validate a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, choosing the format from its extension.
    /// Anything other than `.json` is read as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }

    /// Reject settings that would make batching or generation impossible.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.max_gen_toks == 0 {
            return Err(Error::Config("max_gen_toks must be at least 1".into()));
        }
        if self.max_length == Some(0) {
            return Err(Error::Config("max_length must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_max_gen_toks(mut self, max_gen_toks: usize) -> Self {
        self.max_gen_toks = max_gen_toks;
        self
    }
}
