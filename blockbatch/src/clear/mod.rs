//! Region Clear Orchestrator.
//!
//! Empties large regions chunk by chunk on top of the [`CommandExecutor`],
//! optionally restoring a ground layer, under a global time budget.
//!
//! ```text
//! PLANNING ──► EXECUTING ──► per chunk: ATTEMPT ──► SUCCESS ──► GROUND_RESTORE
//!                              │            │
//!                              │            └─► RETRY (≤ max_chunk_retries) ──► FAILED
//!                              ▼
//!                          REPORTING ──► OperationResult / format_report
//! ```
//!
//! [`CommandExecutor`]: crate::executor::CommandExecutor

mod checkpoint;
mod orchestrator;
mod report;
mod types;

pub use checkpoint::{CheckpointError, ClearCheckpoint};
pub use orchestrator::{ProgressCallback, RegionClearer};
pub use report::format_report;
pub use types::{ChunkError, ChunkResult, ClearConfig, ClearError, OperationResult};
