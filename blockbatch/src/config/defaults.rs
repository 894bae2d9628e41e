//! Default values and constants for all configuration settings.
//!
//! Component `Default` impls read from here so the INI defaults and the
//! library defaults cannot drift apart.

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// Connection
// =============================================================================

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 25575;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Environment variable consulted for the RCON password.
pub const PASSWORD_ENV_VAR: &str = "BLOCKBATCH_RCON_PASSWORD";

// =============================================================================
// Executor
// =============================================================================

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;
/// The server's `fill` limit.
pub const DEFAULT_MAX_ELEMENTS_PER_COMMAND: u64 = 32_768;
pub const DEFAULT_POOL_SIZE: usize = 1;

// =============================================================================
// Throughput
// =============================================================================

pub const DEFAULT_CHUNK_SIZE: u32 = 32;
pub const DEFAULT_MIN_CHUNK_SIZE: u32 = 8;
pub const DEFAULT_MAX_CHUNK_SIZE: u32 = 64;
pub const DEFAULT_CHUNK_SIZE_STEP: u32 = 8;
pub const DEFAULT_THROUGHPUT_WINDOW: usize = 10;
pub const DEFAULT_FAST_THRESHOLD: f64 = 20_000.0;
pub const DEFAULT_SLOW_THRESHOLD: f64 = 5_000.0;

// =============================================================================
// Cache
// =============================================================================

pub const DEFAULT_STATE_TTL_SECS: u64 = 30;

// =============================================================================
// Clear
// =============================================================================

pub const DEFAULT_CLEAR_AREA: (i32, i32, i32, i32) = (0, 0, 127, 127);
pub const DEFAULT_CLEAR_Y: (i32, i32) = (60, 319);
pub const DEFAULT_GROUND_Y: (i32, i32) = (60, 63);
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CHUNK_RETRIES: u32 = 3;
pub const DEFAULT_CHUNK_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_CLEAR_BLOCK: &str = "minecraft:air";
pub const DEFAULT_GROUND_BLOCK: &str = "minecraft:grass_block";
pub const DEFAULT_MIN_SUCCESS_RATIO: f64 = 1.0;

// =============================================================================
// Logging
// =============================================================================

pub const DEFAULT_LOG_FILE: &str = "blockbatch.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                password: None,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            executor: ExecutorSettings {
                command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
                max_elements_per_command: DEFAULT_MAX_ELEMENTS_PER_COMMAND,
                pool_size: DEFAULT_POOL_SIZE,
                concurrent_fills: false,
                concurrent_commands: false,
            },
            throughput: ThroughputSettings {
                default_chunk_size: DEFAULT_CHUNK_SIZE,
                min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
                max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
                chunk_size_step: DEFAULT_CHUNK_SIZE_STEP,
                window_size: DEFAULT_THROUGHPUT_WINDOW,
                fast_threshold: DEFAULT_FAST_THRESHOLD,
                slow_threshold: DEFAULT_SLOW_THRESHOLD,
            },
            cache: CacheSettings {
                state_ttl: DEFAULT_STATE_TTL_SECS,
            },
            clear: ClearSettings {
                x_min: DEFAULT_CLEAR_AREA.0,
                z_min: DEFAULT_CLEAR_AREA.1,
                x_max: DEFAULT_CLEAR_AREA.2,
                z_max: DEFAULT_CLEAR_AREA.3,
                clear_y_min: DEFAULT_CLEAR_Y.0,
                clear_y_max: DEFAULT_CLEAR_Y.1,
                ground_y_min: DEFAULT_GROUND_Y.0,
                ground_y_max: DEFAULT_GROUND_Y.1,
                chunk_size: None,
                chunk_timeout: DEFAULT_CHUNK_TIMEOUT_SECS,
                max_chunk_retries: DEFAULT_MAX_CHUNK_RETRIES,
                chunk_retry_delay_ms: DEFAULT_CHUNK_RETRY_DELAY_MS,
                operation_timeout: DEFAULT_OPERATION_TIMEOUT_SECS,
                workers: DEFAULT_WORKERS,
                clear_block: DEFAULT_CLEAR_BLOCK.to_string(),
                ground_block: DEFAULT_GROUND_BLOCK.to_string(),
                min_success_ratio: DEFAULT_MIN_SUCCESS_RATIO,
                checkpoint: None,
            },
            logging: LoggingSettings {
                file: config_directory().join("logs").join(DEFAULT_LOG_FILE),
            },
        }
    }
}
