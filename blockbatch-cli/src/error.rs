//! CLI error handling with user-friendly messages.
//!
//! Every failure ends in [`CliError::exit`], which prints the message and
//! recovery hints and exits with status 1.

use std::fmt;
use std::process;

use blockbatch::clear::ClearError;
use blockbatch::config::{ConfigError, ConfigFileError};
use blockbatch::executor::CommandError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Invalid runtime configuration
    Config(ConfigError),
    /// Invalid command-line arguments
    Usage(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// A command reached the server and failed
    Command(CommandError),
    /// A state flag did not hold the expected value
    StateMismatch { key: String, expected: String },
    /// A clear could not start
    Clear(ClearError),
    /// A clear finished without meeting its success policy
    ClearIncomplete,
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        let hints = self.hints();
        if !hints.is_empty() {
            eprintln!();
            eprintln!("Suggestions:");
            for (i, hint) in hints.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, hint);
            }
        }

        process::exit(1)
    }

    fn hints(&self) -> Vec<&'static str> {
        match self {
            CliError::Config(ConfigError::MissingSecret) => vec![
                "Set password in the [connection] section of config.ini",
                "Or export BLOCKBATCH_RCON_PASSWORD, or pass --password",
            ],
            CliError::ConfigFile(_) => vec![
                "Check the file for typos; `blockbatch init --force` rewrites it with defaults",
            ],
            CliError::Command(e) => e.kind.remediation().to_vec(),
            CliError::StateMismatch { .. } => {
                vec!["Use `blockbatch set <key> <value>` to change it"]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration file error: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Command(e) => write!(f, "Command failed ({}): {}", e.kind, e.message),
            CliError::StateMismatch { key, expected } => {
                write!(f, "State {} is not {}", key, expected)
            }
            CliError::Clear(e) => write!(f, "Region clear could not start: {}", e),
            CliError::ClearIncomplete => write!(f, "Region clear did not complete"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Command(e) => Some(e),
            CliError::Clear(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<ClearError> for CliError {
    fn from(e: ClearError) -> Self {
        CliError::Clear(e)
    }
}
