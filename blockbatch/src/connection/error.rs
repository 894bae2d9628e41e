//! Transport-level errors.

use std::io;

use thiserror::Error;

/// Errors raised while talking to the server.
///
/// These never cross the executor boundary: the executor retries the
/// retryable ones and converts the rest into a structured `CommandResult`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// TCP connect failed (refused, unreachable, DNS).
    #[error("could not connect to {target}: {source}")]
    Refused {
        target: String,
        #[source]
        source: io::Error,
    },

    /// TCP connect or authentication did not finish in time.
    #[error("timed out connecting to {target} after {timeout_ms}ms")]
    ConnectTimeout { target: String, timeout_ms: u64 },

    /// The server rejected the shared secret.
    #[error("authentication rejected by {target}")]
    AuthenticationFailed { target: String },

    /// No response arrived within the per-command timeout.
    #[error("no response within {timeout_ms}ms")]
    ResponseTimeout { timeout_ms: u64 },

    /// An established connection failed (reset, broken pipe).
    #[error("connection lost: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// The server sent something that is not a valid packet.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    PoolClosed,
}

impl ConnectionError {
    /// Whether another attempt on a fresh connection may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ConnectionError::AuthenticationFailed { .. } | ConnectionError::PoolClosed
        )
    }

    /// Whether the session that produced this error must be discarded.
    pub fn poisons_session(&self) -> bool {
        !matches!(self, ConnectionError::PoolClosed)
    }
}
