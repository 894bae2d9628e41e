//! Response classification.
//!
//! The server answers every command with free text; success and failure are
//! only distinguishable by wording. [`ResponseClassifier`] turns that text
//! into a [`Classification`], and [`MinecraftClassifier`] knows the
//! vanilla server's phrasing.

use std::sync::OnceLock;

use regex::Regex;

use super::error::{CommandError, ErrorKind};

/// Outcome of classifying one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The command succeeded, optionally reporting how many elements changed.
    Success { elements: Option<u64> },
    /// The server reported a failure.
    Failure(CommandError),
}

/// Maps raw server text to outcomes.
pub trait ResponseClassifier: Send + Sync {
    /// Classify the response to `command`.
    fn classify(&self, command: &str, response: &str) -> Classification;

    /// Extract the current value of state flag `key` from a query response.
    fn parse_state_value(&self, key: &str, response: &str) -> Option<String>;

    /// Whether a block-test probe reported a match.
    fn probe_matched(&self, response: &str) -> bool;
}

/// Classifier for vanilla Minecraft server responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinecraftClassifier;

fn fill_count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:successfully filled|filled)\s+(\d+)\s+(?:blocks?|elements?)")
            .expect("valid regex")
    })
}

fn state_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:is currently set to|is now set to):?\s*(\S+)").expect("valid regex")
    })
}

/// Ordered (pattern, kind) rules applied after the success checks.
fn failure_rules() -> &'static [(Regex, ErrorKind)] {
    static RULES: OnceLock<Vec<(Regex, ErrorKind)>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |pattern: &str, kind| (Regex::new(pattern).expect("valid regex"), kind);
        vec![
            rule(
                r"(?i)(you do not have permission|permission denied|insufficient permission)",
                ErrorKind::PermissionDenied,
            ),
            rule(
                r"(?i)(too many blocks in the specified area|position is not loaded|not loaded)",
                ErrorKind::ExecutionFailed,
            ),
            rule(
                r"(?i)(no (entity|player|targets?) (was|were) found|no such|not found)",
                ErrorKind::TargetNotFound,
            ),
            rule(
                r"(?i)(unknown or incomplete command|incorrect argument|unknown block type|expected .+|invalid .+|<--\[here\])",
                ErrorKind::InvalidCommand,
            ),
            rule(
                r"(?i)^(an unexpected error|could not|failed|error)",
                ErrorKind::ExecutionFailed,
            ),
        ]
    })
}

impl ResponseClassifier for MinecraftClassifier {
    fn classify(&self, _command: &str, response: &str) -> Classification {
        let text = response.trim();

        if let Some(caps) = fill_count_regex().captures(text) {
            let elements = caps.get(1).and_then(|m| m.as_str().parse().ok());
            return Classification::Success { elements };
        }
        if text.eq_ignore_ascii_case("no blocks were filled") {
            // Region already holds the target block.
            return Classification::Success { elements: Some(0) };
        }
        if text.starts_with("Test passed") || text.starts_with("Test failed") {
            return Classification::Success { elements: None };
        }

        for (pattern, kind) in failure_rules() {
            if pattern.is_match(text) {
                return Classification::Failure(CommandError::new(*kind, text));
            }
        }

        Classification::Success { elements: None }
    }

    fn parse_state_value(&self, _key: &str, response: &str) -> Option<String> {
        state_value_regex()
            .captures(response.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn probe_matched(&self, response: &str) -> bool {
        response.trim_start().starts_with("Test passed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(response: &str) -> Classification {
        MinecraftClassifier.classify("cmd", response)
    }

    fn failure_kind(response: &str) -> Option<ErrorKind> {
        match classify(response) {
            Classification::Failure(e) => Some(e.kind),
            Classification::Success { .. } => None,
        }
    }

    #[test]
    fn test_fill_count_extracted() {
        assert_eq!(
            classify("Successfully filled 4096 blocks"),
            Classification::Success {
                elements: Some(4096)
            }
        );
        assert_eq!(
            classify("Successfully filled 1 block"),
            Classification::Success { elements: Some(1) }
        );
        assert_eq!(
            classify("Filled 12 elements"),
            Classification::Success {
                elements: Some(12)
            }
        );
    }

    #[test]
    fn test_no_blocks_filled_is_idempotent_success() {
        assert_eq!(
            classify("No blocks were filled"),
            Classification::Success { elements: Some(0) }
        );
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            failure_kind("Too many blocks in the specified area (maximum 32768, specified 64000)"),
            Some(ErrorKind::ExecutionFailed)
        );
        assert_eq!(
            failure_kind("That position is not loaded"),
            Some(ErrorKind::ExecutionFailed)
        );
        assert_eq!(
            failure_kind("You do not have permission to use this command"),
            Some(ErrorKind::PermissionDenied)
        );
        assert_eq!(
            failure_kind("No player was found"),
            Some(ErrorKind::TargetNotFound)
        );
        assert_eq!(
            failure_kind("Unknown or incomplete command, see below for error"),
            Some(ErrorKind::InvalidCommand)
        );
        assert_eq!(
            failure_kind("Incorrect argument for command<--[HERE]"),
            Some(ErrorKind::InvalidCommand)
        );
    }

    #[test]
    fn test_plain_text_is_success() {
        assert_eq!(
            classify("There are 0 of a max of 20 players online: "),
            Classification::Success { elements: None }
        );
        assert_eq!(classify(""), Classification::Success { elements: None });
    }

    #[test]
    fn test_parse_state_value() {
        let c = MinecraftClassifier;
        assert_eq!(
            c.parse_state_value("doTileDrops", "Gamerule doTileDrops is currently set to: false"),
            Some("false".to_string())
        );
        assert_eq!(
            c.parse_state_value("doTileDrops", "Gamerule doTileDrops is now set to: true"),
            Some("true".to_string())
        );
        assert_eq!(c.parse_state_value("x", "Unknown game rule"), None);
    }

    #[test]
    fn test_probe_matched() {
        let c = MinecraftClassifier;
        assert!(c.probe_matched("Test passed"));
        assert!(c.probe_matched("Test passed, count: 5"));
        assert!(!c.probe_matched("Test failed"));
        assert!(!c.probe_matched("Unknown block type"));
    }
}
