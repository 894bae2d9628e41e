//! Outcome of a command or a batch of commands.

use serde::Serialize;

use super::error::{CommandError, ErrorKind};

/// Structured outcome of one logical command.
///
/// Batched fills produce a single `CommandResult` whose counters describe the
/// sub-commands. A plain command counts as one sub-command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// The command as submitted (or a summary for batches).
    pub command: String,
    pub success: bool,
    pub error: Option<CommandError>,
    /// Additional attempts made after the first.
    pub retries: u32,
    /// Raw server text of the last response, if any.
    pub response: String,
    /// Elements the server reported changing.
    pub elements_affected: u64,
    pub sub_commands: usize,
    pub failed_sub_commands: usize,
    /// Sub-commands skipped because the region already matched.
    pub skipped_sub_commands: usize,
}

impl CommandResult {
    pub fn succeeded(
        command: impl Into<String>,
        response: impl Into<String>,
        elements_affected: u64,
        retries: u32,
    ) -> Self {
        Self {
            command: command.into(),
            success: true,
            error: None,
            retries,
            response: response.into(),
            elements_affected,
            sub_commands: 1,
            failed_sub_commands: 0,
            skipped_sub_commands: 0,
        }
    }

    pub fn failed(
        command: impl Into<String>,
        error: CommandError,
        response: impl Into<String>,
        retries: u32,
    ) -> Self {
        Self {
            command: command.into(),
            success: false,
            error: Some(error),
            retries,
            response: response.into(),
            elements_affected: 0,
            sub_commands: 1,
            failed_sub_commands: 1,
            skipped_sub_commands: 0,
        }
    }

    /// Input rejected before anything was sent.
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::failed(
            command,
            CommandError::new(ErrorKind::InvalidCommand, reason),
            String::new(),
            0,
        )
    }

    /// Work that was not needed because the target state already held.
    pub fn skipped(command: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            skipped_sub_commands: 1,
            ..Self::succeeded(command, response, 0, 0)
        }
    }

    /// Error kind, if the command failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
