//! # Model Collaborators
//!
//! The scorer treats the tokenizer and the sequence model as black boxes
//! described by two traits:
//!
//! * [`Tokenizer`] - text to token ids and back, plus the end-of-text id
//! * [`CausalModel`] - batched forward pass and autoregressive generation
//!
//! ## Feature Flags
//!
//! - `tokenizers`: Enables [`hf::HfTokenizer`], backed by Hugging Face `tokenizer.json` files

mod core_trait;

#[cfg_attr(docsrs, doc(cfg(feature = "tokenizers")))]
#[cfg(feature = "tokenizers")]
pub mod hf;

pub use core_trait::*;

#[cfg(test)]
/// Mock tokenizer and model.
///
/// Operate on the host backend with a scripted vocabulary
pub(crate) mod mock_model;
