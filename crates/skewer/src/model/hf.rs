//! Tokenizer adapter over the `tokenizers` crate

use std::path::Path;
use tokenizers::Tokenizer as HfInner;
use super::Tokenizer;
use crate::error::{Error, Result};

/// End-of-text spellings, in lookup order
const EOT_SPELLINGS: [&str; 4] = ["<|endoftext|>", "<|end_of_text|>", "</s>", "<eos>"];

/// Wrapper around a `tokenizer.json` tokenizer
pub struct HfTokenizer {
    tokenizer: HfInner,
    eot_token_id: u32,
}

impl HfTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    ///
    /// The end-of-text id is looked up among the usual spellings; loading fails
    /// when none of them is in the vocabulary.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = HfInner::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("{}: {}", path.display(), e)))?;
        Self::from_tokenizer(tokenizer)
    }

    /// Wrap an already loaded tokenizer, looking up its end-of-text id
    pub fn from_tokenizer(tokenizer: HfInner) -> Result<Self> {
        let eot_token_id = EOT_SPELLINGS
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .ok_or_else(|| Error::Tokenizer(format!("no end-of-text token among {:?}", EOT_SPELLINGS)))?;
        Ok(Self { tokenizer, eot_token_id })
    }

    /// Wrap an already loaded tokenizer with an explicit end-of-text id
    pub fn new(tokenizer: HfInner, eot_token_id: u32) -> Self {
        Self { tokenizer, eot_token_id }
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }

    fn eot_token_id(&self) -> u32 {
        self.eot_token_id
    }
}
