//! Conversion from file settings to component configs.

use std::time::Duration;

use super::defaults::PASSWORD_ENV_VAR;
use super::settings::ConfigFile;
use crate::clear::ClearConfig;
use crate::connection::ConnectionConfig;
use crate::coord::{Area, YRange};
use crate::executor::ExecutorConfig;
use crate::throughput::ThroughputConfig;

impl ConfigFile {
    /// Connection parameters, with the password falling back to
    /// `BLOCKBATCH_RCON_PASSWORD` when the file leaves it unset.
    pub fn connection_config(&self) -> ConnectionConfig {
        self.connection_config_with(std::env::var(PASSWORD_ENV_VAR).ok())
    }

    fn connection_config_with(&self, env_password: Option<String>) -> ConnectionConfig {
        let password = self
            .connection
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| env_password.filter(|p| !p.is_empty()));

        ConnectionConfig {
            host: self.connection.host.clone(),
            port: self.connection.port,
            password,
            connect_timeout: Duration::from_secs(self.connection.connect_timeout),
        }
    }

    pub fn throughput_config(&self) -> ThroughputConfig {
        let t = &self.throughput;
        ThroughputConfig {
            default_chunk_size: t.default_chunk_size,
            min_chunk_size: t.min_chunk_size,
            max_chunk_size: t.max_chunk_size,
            step: t.chunk_size_step,
            window_size: t.window_size,
            fast_threshold: t.fast_threshold,
            slow_threshold: t.slow_threshold,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        let e = &self.executor;
        ExecutorConfig {
            command_timeout: Duration::from_secs(e.command_timeout),
            max_retries: e.max_retries,
            retry_backoff: Duration::from_millis(e.retry_backoff_ms),
            max_elements_per_command: e.max_elements_per_command,
            pool_size: e.pool_size,
            concurrent_fills: e.concurrent_fills,
            concurrent_commands: e.concurrent_commands,
            state_ttl: Duration::from_secs(self.cache.state_ttl),
            throughput: self.throughput_config(),
        }
    }

    pub fn clear_config(&self) -> ClearConfig {
        let c = &self.clear;
        ClearConfig {
            clear_y: YRange::new(c.clear_y_min, c.clear_y_max),
            ground_y: YRange::new(c.ground_y_min, c.ground_y_max),
            chunk_size: c.chunk_size,
            chunk_timeout: Duration::from_secs(c.chunk_timeout),
            max_chunk_retries: c.max_chunk_retries,
            chunk_retry_delay: Duration::from_millis(c.chunk_retry_delay_ms),
            operation_timeout: Duration::from_secs(c.operation_timeout),
            workers: c.workers,
            clear_block: c.clear_block.clone(),
            ground_block: c.ground_block.clone(),
            min_success_ratio: c.min_success_ratio,
            checkpoint: c.checkpoint.clone(),
        }
    }

    /// Default area for `clear` when none is given on the command line.
    pub fn clear_area(&self) -> Area {
        Area::new(
            self.clear.x_min,
            self.clear.z_min,
            self.clear.x_max,
            self.clear.z_max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_component_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.executor_config(), ExecutorConfig::default());
        assert_eq!(config.throughput_config(), ThroughputConfig::default());
        assert_eq!(config.clear_config(), ClearConfig::default());
    }

    #[test]
    fn test_file_password_wins_over_env() {
        let mut config = ConfigFile::default();
        config.connection.password = Some("from-file".to_string());

        let connection = config.connection_config_with(Some("from-env".to_string()));
        assert_eq!(connection.password.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_env_password_fallback() {
        let config = ConfigFile::default();

        let connection = config.connection_config_with(Some("from-env".to_string()));
        assert_eq!(connection.password.as_deref(), Some("from-env"));
        assert!(connection.validate().is_ok());
    }

    #[test]
    fn test_missing_password_fails_validation() {
        let config = ConfigFile::default();

        let connection = config.connection_config_with(Some(String::new()));
        assert_eq!(
            connection.validate(),
            Err(crate::config::ConfigError::MissingSecret)
        );
    }

    #[test]
    fn test_clear_settings_carried_over() {
        let mut config = ConfigFile::default();
        config.clear.x_min = -64;
        config.clear.chunk_size = Some(16);
        config.clear.chunk_retry_delay_ms = 500;
        config.cache.state_ttl = 5;

        assert_eq!(config.clear_area(), Area::new(-64, 0, 127, 127));
        let clear = config.clear_config();
        assert_eq!(clear.chunk_size, Some(16));
        assert_eq!(clear.chunk_retry_delay, Duration::from_millis(500));
        assert_eq!(config.executor_config().state_ttl, Duration::from_secs(5));
    }
}
