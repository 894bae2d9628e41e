//! Configuration loading and validation.
//!
//! The user's settings live in `~/.blockbatch/config.ini`:
//!
//! ```ini
//! [connection]
//! host = 127.0.0.1
//! port = 25575
//! password = secret
//!
//! [executor]
//! command_timeout = 10
//! max_retries = 3
//!
//! [clear]
//! x_min = 0
//! z_min = 0
//! x_max = 127
//! z_max = 127
//! ```
//!
//! Settings structs live in [`settings`], constants in [`defaults`],
//! parsing in `parser`, and serialization in `writer`. [`ConfigFile`]
//! converts into the runtime config type of each component.

pub mod defaults;
mod file;
mod parser;
mod runtime;
pub mod settings;
mod writer;

use thiserror::Error;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::*;
pub use writer::to_config_string;

/// Invalid runtime configuration.
///
/// Configuration errors are fatal: they are reported before any command is
/// sent and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No shared secret was configured.
    #[error(
        "no RCON password configured (set [connection] password or BLOCKBATCH_RCON_PASSWORD)"
    )]
    MissingSecret,

    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
