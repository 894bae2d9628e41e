//! blockbatch - Batched region edits for RCON-administered game servers
//!
//! This library drives bulk, region-altering commands against a remote
//! server that speaks a plaintext request/response command protocol with a
//! hard per-command element limit (the `fill` block limit).
//!
//! # Architecture
//!
//! ```text
//! RegionClearer (clear)
//!     │
//!     ▼
//! CommandExecutor (executor) ──► ThroughputController (throughput)
//!     │        │                 StateCache (state)
//!     │        └─► BatchPlanner / DispatchPolicy (batch)
//!     ▼
//! ConnectionPool (connection) ──► RCON session ──► server
//! ```

pub mod batch;
pub mod clear;
pub mod config;
pub mod connection;
pub mod coord;
pub mod executor;
pub mod logging;
pub mod state;
pub mod throughput;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
