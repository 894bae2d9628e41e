//! Connection management for the remote command server.
//!
//! This module owns everything below the command level:
//! - RCON wire framing (`packet`)
//! - TCP connect + authenticate (`rcon`)
//! - A bounded pool of reusable sessions with reconnect-on-failure (`pool`)
//! - An in-process scripted server for tests (`mock`)
//!
//! # Architecture
//!
//! ```text
//! CommandExecutor
//!       │ acquire()
//!       ▼
//! ConnectionPool ── Semaphore (≤ N sessions in use)
//!       │
//!       ├── Slot 0 ── Box<dyn Session>
//!       ├── Slot 1 ── Box<dyn Session>
//!       └── ...           ▲
//!                         │ connect() on first use / after failure
//!                   Arc<dyn Connector>
//! ```
//!
//! The `Connector` / `Session` pair is the seam between protocol plumbing
//! and the retry logic above it. Both traits return boxed futures so they
//! can be used as trait objects.

mod error;
pub mod mock;
pub mod packet;
mod pool;
mod rcon;

use std::future::Future;
use std::pin::Pin;

pub use error::ConnectionError;
pub use pool::{ConnectionPool, PooledSession};
pub use rcon::{ConnectionConfig, RconConnector, RconSession};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opens authenticated sessions to the remote server.
pub trait Connector: Send + Sync {
    /// Open a new session, including authentication.
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, ConnectionError>>;

    /// Human-readable target, e.g. `127.0.0.1:25575`.
    fn target(&self) -> String;
}

/// One authenticated request/response channel.
///
/// A session handles a single request at a time; callers serialize access
/// through the pool.
pub trait Session: Send {
    /// Send a command and wait for its response body.
    fn send<'a>(&'a mut self, command: &'a str)
        -> BoxFuture<'a, Result<String, ConnectionError>>;
}
