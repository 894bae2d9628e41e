//! CLI runner for common setup and operations.
//!
//! Loads the config file, initializes logging and builds the executor so
//! command handlers only deal with their own work.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use blockbatch::config::{config_file_path, ConfigFile};
use blockbatch::executor::CommandExecutor;
use blockbatch::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load `config_path` (or the default path) and initialize logging.
    ///
    /// Log records go to stderr only when stderr is not a terminal or
    /// `debug` is set, so progress bars stay readable.
    pub fn new(config_path: Option<&Path>, debug: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "blockbatch.log".to_string());

        let stderr_enabled = debug || !atty::is(atty::Stream::Stderr);
        let logging_guard = init_logging(&log_dir, &log_file, stderr_enabled, debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = blockbatch::VERSION,
            command,
            config = %self.config_path.display(),
            "blockbatch starting"
        );
    }

    /// Build an executor from the loaded config.
    ///
    /// `password` overrides both the file and the environment.
    pub fn executor(&self, password: Option<String>) -> Result<Arc<CommandExecutor>, CliError> {
        let mut connection = self.config.connection_config();
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            connection.password = Some(password);
        }
        let executor = CommandExecutor::connect(&connection, self.config.executor_config())?;
        info!(target_addr = %connection.address(), "Executor ready");
        Ok(Arc::new(executor))
    }

    /// Multi-threaded runtime for the async library calls.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}
