//! Batch planning and dispatch.
//!
//! - [`plan_fill`] splits an oversized fill into sub-regions that each fit
//!   the server's per-command element limit.
//! - [`plan_chunks`] tiles a horizontal area into full-height columns for the
//!   region clearer.
//! - [`DispatchPolicy`] decides whether a batch's sub-commands may be sent
//!   concurrently.

mod dispatch;
mod planner;

pub use dispatch::{BatchProfile, DispatchMode, DispatchPolicy, OperationKind};
pub use planner::{plan_chunks, plan_fill, ChunkPlan, PlanError};
