//! # Data-Parallel Coordination
//!
//! Each worker scores its own shard of requests independently. The only
//! cross-worker synchronization point is the count gather performed by
//! [`pad_to_parity`], which every worker must reach.
//!
//! * [`Topology`] - rank, world size and the count-gather collective
//! * [`SingleProcess`] - the default, one worker and no collective
//! * [`LocalGroup`] - an in-process simulated group for tests and tools
//! * [`pad_to_parity`] / [`trim_padding`] - padding equalization around the collective

mod equalizer;
mod topology;

pub use equalizer::{pad_to_parity, trim_padding};
pub use topology::{LocalGroup, LocalWorker, SingleProcess, Topology};
