//! Serialization of `ConfigFile` to INI text.
//!
//! Produces a commented file so `blockbatch init` output documents itself.

use super::settings::ConfigFile;

/// Render a configuration as INI text.
pub fn to_config_string(config: &ConfigFile) -> String {
    let c = &config.connection;
    let e = &config.executor;
    let t = &config.throughput;
    let clear = &config.clear;

    let chunk_size = clear
        .chunk_size
        .map(|n| n.to_string())
        .unwrap_or_else(|| "auto".to_string());
    let checkpoint = clear
        .checkpoint
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    format!(
        r#"[connection]
; RCON host and port
host = {host}
port = {port}
; Shared secret. Leave empty to read it from BLOCKBATCH_RCON_PASSWORD
password = {password}
; Seconds allowed for connect + authenticate
connect_timeout = {connect_timeout}

[executor]
; Seconds to wait for a single response
command_timeout = {command_timeout}
; Total attempts per command, first attempt included
max_retries = {max_retries}
; Delay between attempts is retry_backoff_ms x attempt number
retry_backoff_ms = {retry_backoff_ms}
; Blocks the server accepts in one fill command
max_elements_per_command = {max_elements}
; Maximum open connections
pool_size = {pool_size}
; Whether the server tolerates concurrent fills / independent commands
concurrent_fills = {concurrent_fills}
concurrent_commands = {concurrent_commands}

[throughput]
default_chunk_size = {default_chunk}
min_chunk_size = {min_chunk}
max_chunk_size = {max_chunk}
chunk_size_step = {step}
; Recent operations averaged when tuning the chunk size
window_size = {window}
; Elements per second thresholds
fast_threshold = {fast}
slow_threshold = {slow}

[cache]
; Seconds a verified state flag stays valid
state_ttl = {state_ttl}

[clear]
x_min = {x_min}
z_min = {z_min}
x_max = {x_max}
z_max = {z_max}
clear_y_min = {clear_y_min}
clear_y_max = {clear_y_max}
ground_y_min = {ground_y_min}
ground_y_max = {ground_y_max}
; Chunk side length, or auto to follow the throughput controller
chunk_size = {chunk_size}
; Seconds per chunk attempt
chunk_timeout = {chunk_timeout}
; Attempts per chunk, first attempt included
max_chunk_retries = {max_chunk_retries}
chunk_retry_delay_ms = {chunk_retry_delay_ms}
; Seconds for the whole operation
operation_timeout = {operation_timeout}
workers = {workers}
clear_block = {clear_block}
ground_block = {ground_block}
; Fraction of chunks that must succeed (1.0 = every chunk)
min_success_ratio = {min_success_ratio}
; Optional JSON file recording completed chunks
checkpoint = {checkpoint}

[logging]
file = {log_file}
"#,
        host = c.host,
        port = c.port,
        password = c.password.as_deref().unwrap_or(""),
        connect_timeout = c.connect_timeout,
        command_timeout = e.command_timeout,
        max_retries = e.max_retries,
        retry_backoff_ms = e.retry_backoff_ms,
        max_elements = e.max_elements_per_command,
        pool_size = e.pool_size,
        concurrent_fills = e.concurrent_fills,
        concurrent_commands = e.concurrent_commands,
        default_chunk = t.default_chunk_size,
        min_chunk = t.min_chunk_size,
        max_chunk = t.max_chunk_size,
        step = t.chunk_size_step,
        window = t.window_size,
        fast = t.fast_threshold,
        slow = t.slow_threshold,
        state_ttl = config.cache.state_ttl,
        x_min = clear.x_min,
        z_min = clear.z_min,
        x_max = clear.x_max,
        z_max = clear.z_max,
        clear_y_min = clear.clear_y_min,
        clear_y_max = clear.clear_y_max,
        ground_y_min = clear.ground_y_min,
        ground_y_max = clear.ground_y_max,
        chunk_size = chunk_size,
        chunk_timeout = clear.chunk_timeout,
        max_chunk_retries = clear.max_chunk_retries,
        chunk_retry_delay_ms = clear.chunk_retry_delay_ms,
        operation_timeout = clear.operation_timeout,
        workers = clear.workers,
        clear_block = clear.clear_block,
        ground_block = clear.ground_block,
        min_success_ratio = clear.min_success_ratio,
        checkpoint = checkpoint,
        log_file = config.logging.file.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_contains_every_section() {
        let text = to_config_string(&ConfigFile::default());
        for section in [
            "[connection]",
            "[executor]",
            "[throughput]",
            "[cache]",
            "[clear]",
            "[logging]",
        ] {
            assert!(text.contains(section), "missing {section}");
        }
    }

    #[test]
    fn test_default_output_parses_back_to_defaults() {
        let text = to_config_string(&ConfigFile::default());
        let ini = ini::Ini::load_from_str(&text).unwrap();
        let parsed = super::super::parser::parse_ini(&ini).unwrap();

        let defaults = ConfigFile::default();
        assert!(parsed.connection.password.is_none());
        assert!(parsed.clear.chunk_size.is_none());
        assert!(parsed.clear.checkpoint.is_none());
        assert_eq!(parsed.clear.clear_block, defaults.clear.clear_block);
        assert_eq!(
            parsed.throughput.fast_threshold,
            defaults.throughput.fast_threshold
        );
    }
}
