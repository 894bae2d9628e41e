//! Merging sub-command results into one batch result.

use super::error::{CommandError, ErrorKind};
use super::result::CommandResult;

/// Combine sub-command results into a single result.
///
/// Counters, elements and retries are summed. The batch succeeds only if
/// every sub-command succeeded; otherwise the error takes the kind of the
/// first failure and reports how many failed. `elements_affected` keeps
/// the work that did succeed.
pub fn merge(label: impl Into<String>, results: Vec<CommandResult>) -> CommandResult {
    let label = label.into();
    let mut merged = CommandResult {
        command: label,
        success: true,
        error: None,
        retries: 0,
        response: String::new(),
        elements_affected: 0,
        sub_commands: 0,
        failed_sub_commands: 0,
        skipped_sub_commands: 0,
    };

    let mut first_error: Option<CommandError> = None;
    for result in results {
        merged.retries += result.retries;
        merged.elements_affected += result.elements_affected;
        merged.sub_commands += result.sub_commands;
        merged.failed_sub_commands += result.failed_sub_commands;
        merged.skipped_sub_commands += result.skipped_sub_commands;
        if !result.success {
            merged.success = false;
            if first_error.is_none() {
                first_error = result.error;
                merged.response = result.response;
            }
        } else if merged.success {
            merged.response = result.response;
        }
    }

    if !merged.success {
        let error = first_error.unwrap_or_else(|| {
            CommandError::new(ErrorKind::ExecutionFailed, "sub-command failed")
        });
        merged.error = Some(CommandError::new(
            error.kind,
            format!(
                "{} of {} sub-commands failed; first error: {}",
                merged.failed_sub_commands, merged.sub_commands, error.message
            ),
        ));
    }

    merged
}
