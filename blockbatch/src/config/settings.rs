//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Server address and credentials
    pub connection: ConnectionSettings,
    /// Per-command timeout, retry and batching behaviour
    pub executor: ExecutorSettings,
    /// Adaptive chunk size tuning
    pub throughput: ThroughputSettings,
    /// State flag cache
    pub cache: CacheSettings,
    /// Region clear orchestration
    pub clear: ClearSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// `[connection]` section.
#[derive(Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    /// Shared secret; may instead come from the environment.
    pub password: Option<String>,
    /// Connect + authenticate timeout in seconds.
    pub connect_timeout: u64,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// `[executor]` section.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Seconds to wait for a single response.
    pub command_timeout: u64,
    /// Total attempts per command (first attempt included).
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds (multiplied by attempt number).
    pub retry_backoff_ms: u64,
    /// Server's per-command element limit.
    pub max_elements_per_command: u64,
    /// Maximum concurrent connections.
    pub pool_size: usize,
    /// Whether the server tolerates concurrent fills.
    pub concurrent_fills: bool,
    /// Whether the server tolerates concurrent independent commands.
    pub concurrent_commands: bool,
}

/// `[throughput]` section.
#[derive(Debug, Clone)]
pub struct ThroughputSettings {
    pub default_chunk_size: u32,
    pub min_chunk_size: u32,
    pub max_chunk_size: u32,
    pub chunk_size_step: u32,
    /// Number of recent operations averaged.
    pub window_size: usize,
    /// Elements/second above which the chunk size grows.
    pub fast_threshold: f64,
    /// Elements/second below which the chunk size shrinks.
    pub slow_threshold: f64,
}

/// `[cache]` section.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Seconds a verified state flag stays valid.
    pub state_ttl: u64,
}

/// `[clear]` section.
#[derive(Debug, Clone)]
pub struct ClearSettings {
    pub x_min: i32,
    pub z_min: i32,
    pub x_max: i32,
    pub z_max: i32,
    pub clear_y_min: i32,
    pub clear_y_max: i32,
    pub ground_y_min: i32,
    pub ground_y_max: i32,
    /// Fixed chunk size; `None` uses the adaptive controller's current value.
    pub chunk_size: Option<u32>,
    /// Seconds allowed for one chunk attempt.
    pub chunk_timeout: u64,
    pub max_chunk_retries: u32,
    pub chunk_retry_delay_ms: u64,
    /// Seconds allowed for the whole operation.
    pub operation_timeout: u64,
    pub workers: usize,
    pub clear_block: String,
    pub ground_block: String,
    /// Fraction of chunks that must succeed for the run to count as a success.
    pub min_success_ratio: f64,
    /// Optional checkpoint file for resumable runs.
    pub checkpoint: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub file: PathBuf,
}
