//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [connection] section
    if let Some(section) = ini.section(Some("connection")) {
        let s = Section::new("connection", section);
        if let Some(v) = s.string("host") {
            config.connection.host = v;
        }
        if let Some(v) = s.parse("port", "must be a port number (1-65535)")? {
            if v == 0 {
                return Err(s.invalid("port", "0", "must be a port number (1-65535)"));
            }
            config.connection.port = v;
        }
        if let Some(v) = s.string("password") {
            config.connection.password = Some(v);
        }
        if let Some(v) = s.parse("connect_timeout", "must be a positive integer (seconds)")? {
            config.connection.connect_timeout = v;
        }
    }

    // [executor] section
    if let Some(section) = ini.section(Some("executor")) {
        let s = Section::new("executor", section);
        if let Some(v) = s.positive("command_timeout", "must be a positive integer (seconds)")? {
            config.executor.command_timeout = v;
        }
        if let Some(v) = s.positive("max_retries", "must be a positive integer")? {
            config.executor.max_retries = v;
        }
        if let Some(v) = s.parse("retry_backoff_ms", "must be an integer (milliseconds)")? {
            config.executor.retry_backoff_ms = v;
        }
        if let Some(v) = s.positive("max_elements_per_command", "must be a positive integer")? {
            config.executor.max_elements_per_command = v;
        }
        if let Some(v) = s.positive("pool_size", "must be a positive integer")? {
            config.executor.pool_size = v;
        }
        if let Some(v) = s.boolean("concurrent_fills")? {
            config.executor.concurrent_fills = v;
        }
        if let Some(v) = s.boolean("concurrent_commands")? {
            config.executor.concurrent_commands = v;
        }
    }

    // [throughput] section
    if let Some(section) = ini.section(Some("throughput")) {
        let s = Section::new("throughput", section);
        if let Some(v) = s.positive("default_chunk_size", "must be a positive integer")? {
            config.throughput.default_chunk_size = v;
        }
        if let Some(v) = s.positive("min_chunk_size", "must be a positive integer")? {
            config.throughput.min_chunk_size = v;
        }
        if let Some(v) = s.positive("max_chunk_size", "must be a positive integer")? {
            config.throughput.max_chunk_size = v;
        }
        if let Some(v) = s.positive("chunk_size_step", "must be a positive integer")? {
            config.throughput.chunk_size_step = v;
        }
        if let Some(v) = s.positive("window_size", "must be a positive integer")? {
            config.throughput.window_size = v;
        }
        if let Some(v) = s.parse("fast_threshold", "must be a number (elements/second)")? {
            config.throughput.fast_threshold = v;
        }
        if let Some(v) = s.parse("slow_threshold", "must be a number (elements/second)")? {
            config.throughput.slow_threshold = v;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        let s = Section::new("cache", section);
        if let Some(v) = s.parse("state_ttl", "must be an integer (seconds)")? {
            config.cache.state_ttl = v;
        }
    }

    // [clear] section
    if let Some(section) = ini.section(Some("clear")) {
        let s = Section::new("clear", section);
        let coordinate = "must be an integer block coordinate";
        if let Some(v) = s.parse("x_min", coordinate)? {
            config.clear.x_min = v;
        }
        if let Some(v) = s.parse("z_min", coordinate)? {
            config.clear.z_min = v;
        }
        if let Some(v) = s.parse("x_max", coordinate)? {
            config.clear.x_max = v;
        }
        if let Some(v) = s.parse("z_max", coordinate)? {
            config.clear.z_max = v;
        }
        if let Some(v) = s.parse("clear_y_min", coordinate)? {
            config.clear.clear_y_min = v;
        }
        if let Some(v) = s.parse("clear_y_max", coordinate)? {
            config.clear.clear_y_max = v;
        }
        if let Some(v) = s.parse("ground_y_min", coordinate)? {
            config.clear.ground_y_min = v;
        }
        if let Some(v) = s.parse("ground_y_max", coordinate)? {
            config.clear.ground_y_max = v;
        }
        if let Some(v) = s.string("chunk_size") {
            config.clear.chunk_size = match v.to_lowercase().as_str() {
                "auto" => None,
                _ => match v.parse::<u32>() {
                    Ok(n) if n > 0 => Some(n),
                    _ => {
                        return Err(s.invalid(
                            "chunk_size",
                            &v,
                            "must be a positive integer or 'auto'",
                        ))
                    }
                },
            };
        }
        if let Some(v) = s.positive("chunk_timeout", "must be a positive integer (seconds)")? {
            config.clear.chunk_timeout = v;
        }
        if let Some(v) = s.positive("max_chunk_retries", "must be a positive integer")? {
            config.clear.max_chunk_retries = v;
        }
        if let Some(v) = s.parse("chunk_retry_delay_ms", "must be an integer (milliseconds)")? {
            config.clear.chunk_retry_delay_ms = v;
        }
        if let Some(v) =
            s.positive("operation_timeout", "must be a positive integer (seconds)")?
        {
            config.clear.operation_timeout = v;
        }
        if let Some(v) = s.positive("workers", "must be a positive integer")? {
            config.clear.workers = v;
        }
        if let Some(v) = s.string("clear_block") {
            config.clear.clear_block = v;
        }
        if let Some(v) = s.string("ground_block") {
            config.clear.ground_block = v;
        }
        if let Some(v) = s.parse::<f64>("min_success_ratio", "must be between 0.0 and 1.0")? {
            if !(0.0..=1.0).contains(&v) {
                return Err(s.invalid(
                    "min_success_ratio",
                    &v.to_string(),
                    "must be between 0.0 and 1.0",
                ));
            }
            config.clear.min_success_ratio = v;
        }
        if let Some(v) = s.string("checkpoint") {
            config.clear.checkpoint = Some(expand_tilde(&v));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        let s = Section::new("logging", section);
        if let Some(v) = s.string("file") {
            config.logging.file = expand_tilde(&v);
        }
    }

    Ok(config)
}

/// Typed accessors over one INI section.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, props: &'a Properties) -> Self {
        Self { name, props }
    }

    /// Trimmed, non-empty string value.
    fn string(&self, key: &str) -> Option<String> {
        self.props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn parse<T: FromStr>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError> {
        match self.string(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.invalid(key, &v, reason)),
        }
    }

    /// Parses into the field's own type, so out-of-range values are
    /// rejected instead of wrapping.
    fn positive<T>(&self, key: &str, reason: &str) -> Result<Option<T>, ConfigFileError>
    where
        T: FromStr + PartialEq + Default,
    {
        match self.parse::<T>(key, reason)? {
            Some(v) if v == T::default() => Err(self.invalid(key, "0", reason)),
            other => Ok(other),
        }
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigFileError> {
        match self.string(key) {
            None => Ok(None),
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(key, &v, "must be true or false")),
            },
        }
    }

    fn invalid(&self, key: &str, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(text).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_parse_connection_section() {
        let config = parse(
            "[connection]\nhost = mc.example.net\nport = 25580\npassword = s3cret\n",
        )
        .unwrap();

        assert_eq!(config.connection.host, "mc.example.net");
        assert_eq!(config.connection.port, 25580);
        assert_eq!(config.connection.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_password_stays_unset() {
        let config = parse("[connection]\npassword =\n").unwrap();
        assert!(config.connection.password.is_none());
    }

    #[test]
    fn test_invalid_port_reports_section_and_key() {
        let err = parse("[connection]\nport = seventy\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section,
                key,
                value,
                ..
            } => {
                assert_eq!(section, "connection");
                assert_eq!(key, "port");
                assert_eq!(value, "seventy");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(parse("[executor]\nmax_retries = 0\n").is_err());
    }

    #[test]
    fn test_out_of_range_count_rejected() {
        match parse("[executor]\nmax_retries = 4294967297\n") {
            Err(ConfigFileError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "max_retries");
                assert_eq!(value, "4294967297");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(parse("[throughput]\nmax_chunk_size = 5000000000\n").is_err());
        assert!(parse("[clear]\nworkers = 8\n").unwrap().clear.workers == 8);
    }

    #[test]
    fn test_chunk_size_auto_and_fixed() {
        let auto = parse("[clear]\nchunk_size = auto\n").unwrap();
        assert!(auto.clear.chunk_size.is_none());

        let fixed = parse("[clear]\nchunk_size = 48\n").unwrap();
        assert_eq!(fixed.clear.chunk_size, Some(48));

        assert!(parse("[clear]\nchunk_size = 0\n").is_err());
    }

    #[test]
    fn test_success_ratio_range() {
        let config = parse("[clear]\nmin_success_ratio = 0.9\n").unwrap();
        assert!((config.clear.min_success_ratio - 0.9).abs() < f64::EPSILON);

        assert!(parse("[clear]\nmin_success_ratio = 1.5\n").is_err());
    }

    #[test]
    fn test_parse_booleans() {
        let config = parse("[executor]\nconcurrent_fills = yes\nconcurrent_commands = off\n")
            .unwrap();
        assert!(config.executor.concurrent_fills);
        assert!(!config.executor.concurrent_commands);

        assert!(parse("[executor]\nconcurrent_fills = maybe\n").is_err());
    }

    #[test]
    fn test_negative_coordinates() {
        let config = parse("[clear]\nx_min = -256\nclear_y_min = -64\n").unwrap();
        assert_eq!(config.clear.x_min, -256);
        assert_eq!(config.clear.clear_y_min, -64);
    }
}
