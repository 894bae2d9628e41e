//! Adaptive throughput control.
//!
//! The controller keeps a sliding window of recent [`PerformanceSample`]s
//! and nudges the chunk size used for batched fills up or down, one step at
//! a time, depending on how many elements per second the server sustains.
//!
//! ```text
//!              avg > fast      avg < slow
//! chunk size ──► + step ──┐   ┌── - step ◄── chunk size
//!                         ▼   ▼
//!                 clamp(min_chunk_size, max_chunk_size)
//! ```

mod controller;
mod types;

pub use controller::ThroughputController;
pub use types::{PerformanceSample, PerformanceStats, ThroughputConfig};
