//! Error taxonomy for command outcomes.
//!
//! Every failure the executor or the clear orchestrator reports carries an
//! [`ErrorKind`] plus a free-text message. Kinds map to a fixed list of
//! recovery suggestions so user-facing output stays consistent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionError;

/// Category of a failed command or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The server could not be reached.
    ConnectionRefused,
    /// An established connection broke mid-request.
    ConnectionLost,
    /// The shared secret was rejected.
    AuthenticationFailed,
    /// No response within the command timeout.
    CommandTimeout,
    /// Malformed input, or the server rejected the syntax.
    InvalidCommand,
    /// The session lacks permission for the command.
    PermissionDenied,
    /// The command named an entity, player or block that doesn't exist.
    TargetNotFound,
    /// The server accepted the command but it failed.
    ExecutionFailed,
    /// A region chunk could not be cleared.
    ChunkFailed,
    /// A chunk was cleared but its ground layer could not be restored.
    GroundRestoreFailed,
}

impl ErrorKind {
    /// Stable identifier used in logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionRefused => "connection_refused",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::AuthenticationFailed => "authentication_failed",
            ErrorKind::CommandTimeout => "command_timeout",
            ErrorKind::InvalidCommand => "invalid_command",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::TargetNotFound => "target_not_found",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::ChunkFailed => "chunk_failed",
            ErrorKind::GroundRestoreFailed => "ground_restore_failed",
        }
    }

    /// Whether a later attempt can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionLost
                | ErrorKind::CommandTimeout
                | ErrorKind::ExecutionFailed
        )
    }

    /// Recovery suggestions, most likely fix first.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            ErrorKind::ConnectionRefused => &[
                "Check that the server is running and RCON is enabled (enable-rcon=true)",
                "Verify the host and port in [connection] match rcon.port in server.properties",
                "Make sure no firewall blocks the RCON port",
            ],
            ErrorKind::ConnectionLost => &[
                "Check the server console for crashes or restarts",
                "Reduce the chunk size or the number of workers to lower server load",
                "Re-run the operation; completed work is not repeated when a checkpoint is set",
            ],
            ErrorKind::AuthenticationFailed => &[
                "Check that the password matches rcon.password in server.properties",
                "Set the password in [connection] or BLOCKBATCH_RCON_PASSWORD",
            ],
            ErrorKind::CommandTimeout => &[
                "Increase command_timeout in [executor]",
                "Use a smaller chunk size so each command does less work",
                "Check the server TPS; an overloaded server answers slowly",
            ],
            ErrorKind::InvalidCommand => &[
                "Check the command syntax for this server version",
                "Check that block ids are namespaced, e.g. minecraft:stone",
            ],
            ErrorKind::PermissionDenied => &[
                "Make sure RCON runs with operator permissions",
                "Check function-permission-level in server.properties",
            ],
            ErrorKind::TargetNotFound => &[
                "Check that the named player, entity or block exists",
                "Make sure the target area is loaded",
            ],
            ErrorKind::ExecutionFailed => &[
                "Make sure the target area is loaded (use forceload if needed)",
                "Reduce max_elements_per_command if the server uses a lower fill limit",
            ],
            ErrorKind::ChunkFailed => &[
                "Re-run the clear over the failed chunks",
                "Increase chunk_timeout or max_chunk_retries in [clear]",
                "Reduce chunk_size in [clear]",
            ],
            ErrorKind::GroundRestoreFailed => &[
                "Re-run with --preserve-terrain to restore the ground layer",
                "Fill the ground range manually with the ground block",
            ],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ConnectionError> for ErrorKind {
    fn from(error: &ConnectionError) -> Self {
        match error {
            ConnectionError::Refused { .. } | ConnectionError::ConnectTimeout { .. } => {
                ErrorKind::ConnectionRefused
            }
            ConnectionError::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            ConnectionError::ResponseTimeout { .. } => ErrorKind::CommandTimeout,
            ConnectionError::Io(_)
            | ConnectionError::Closed
            | ConnectionError::Protocol(_)
            | ConnectionError::PoolClosed => ErrorKind::ConnectionLost,
        }
    }
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Message followed by numbered recovery suggestions.
    pub fn user_message(&self) -> String {
        let mut out = self.message.clone();
        let suggestions = self.kind.remediation();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for (i, suggestion) in suggestions.iter().enumerate() {
                out.push_str(&format!("\n  {}. {}", i + 1, suggestion));
            }
        }
        out
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<&ConnectionError> for CommandError {
    fn from(error: &ConnectionError) -> Self {
        CommandError::new(ErrorKind::from(error), error.to_string())
    }
}
