//! # Tensor Backend
//!
//! This module provides a unified interface for different tensor backends,
//! allowing the scoring engine to build batches and read model outputs in a
//! backend-agnostic manner.

//! ## Feature Flags
//!
//! The module uses feature flags to conditionally compile support for different backends:
//!
//! - `candle`: Enables support for the Candle tensor library
//! - `burn`: Enables support for the Burn tensor library
//!
//! The [`host`] backend is always available and keeps everything in plain vectors.
//!
//! ## Usage
//!
//! Users of this crate can work with tensors in a backend-agnostic way by:
//!
//! 1. Importing the traits ([`TokenTensor`], [`LogitsTensor`])
//! 2. Writing their model against these trait interfaces
//! 3. Enabling the appropriate feature flag for their desired backend

mod core_trait;

pub mod host;

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle tensor backend implementation.
///
/// This module is only available when the `candle` feature flag is enabled.
/// `candle_core::Tensor` serves as token sequence, stacked batch and logits.
pub mod candle;

#[cfg_attr(docsrs, doc(cfg(feature = "burn")))]
#[cfg(feature = "burn")]
/// Burn tensor backend implementation.
///
/// This module is only available when the `burn` feature flag is enabled.
/// Token sequences are `Tensor<B, 1, Int>`, batches `Tensor<B, 2, Int>`
/// and logits `Tensor<B, 3>`.
pub mod burn;


// Re-export the core traits for convenient imports
pub use core_trait::*;
