//! Command execution.
//!
//! The executor is the only component that talks to the connection pool.
//! Everything it returns is a structured [`CommandResult`]; transport errors
//! never escape it.
//!
//! ```text
//! execute_command ──► retry loop ──► ConnectionPool ──► server
//!                           │
//!                           ▼
//!                   ResponseClassifier ──► CommandResult
//!
//! execute_fill ──► plan_fill ──► DispatchPolicy ──► sub-commands
//!                                                      │
//!                  ThroughputController ◄── sample ◄── aggregate::merge
//! ```

pub mod aggregate;
mod classify;
mod command;
mod error;
mod fill;
mod result;

pub use classify::{Classification, MinecraftClassifier, ResponseClassifier};
pub use command::{CommandExecutor, ExecutorConfig};
pub use error::{CommandError, ErrorKind};
pub use fill::{fill_command, probe_command, FillOptions};
pub use result::CommandResult;
