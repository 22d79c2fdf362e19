//! # Skewer
//!
//! Batched log-likelihood scoring for language-model evaluation.
//!
//! ## Overview
//!
//! Benchmarks for causal language models mostly ask one of three questions:
//! how likely is this continuation given that context, how likely is this whole
//! document, and what does the model write when prompted. This library answers
//! all three on top of any model exposing a forward pass and a `generate` call,
//! while keeping the number of forward passes small.
//!
//! Key components include:
//!
//! - A stable reorderer that sorts requests for batching and restores results
//!   to caller order
//! - A batch scorer turning `(context, continuation)` token pairs into
//!   `(log_probability, is_greedy_match)`
//! - Rolling windows for documents longer than the model's context
//! - Padding equalization for data-parallel groups of workers
//! - A generation path stopping at caller-supplied stop strings
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, skewer reserves three dimensions with special meanings:
//!  - The `0th` dimension is the batch dimension
//!  - The `1st` dimension is the sequence dimension
//!  - The `2nd` dimension of model output is the vocabulary dimension
//!
//! ### Backend Traits
//!
//! The `TokenTensor` and `LogitsTensor` traits define what a tensor
//! implementation must provide: token ids go in, per-position scores come out.
//! Scoring itself happens on the host after a log-softmax, so the batching
//! logic stays independent of the tensor library.
//!
//! ### Models
//!
//! The `CausalModel` trait is the seam to the model and `Tokenizer` the seam to
//! its vocabulary. The `Evaluator` combines them with a `Topology` describing
//! the worker group.
//!
//! ## Features
//!
//! - **candle** - Enables candle backend
//! - **burn** - Enables burn backend
//! - **tokenizers** - Enables a `Tokenizer` over HuggingFace `tokenizers`
//!

mod tensor;

pub mod backend;
pub mod config;
pub mod distributed;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod model;
pub mod reorder;
pub mod request;
pub mod scorer;
pub mod telemetry;
pub mod window;

/// Constants for client reference
pub use tensor::constant;

pub use config::EvaluatorConfig;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use request::{CacheKey, GenerationRequest, Request, ScoreResult};
