//! Reading and writing `~/.blockbatch/config.ini`.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;

/// Problems with the config file itself, as opposed to [`super::ConfigError`]
/// for values that are well-formed but unusable.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot parse {}: {}", .path.display(), .source)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("[{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("cannot write {}: {}", .path.display(), .source)]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigFile {
    /// Parse `path`. A missing file yields the defaults so a fresh install
    /// works without `init`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        super::parser::parse_ini(&ini)
    }

    /// Write every setting to `path`, creating parent directories.
    ///
    /// The text goes to a sibling temp file first and is renamed into place.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let unwritable = |source| ConfigFileError::Unwritable {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(unwritable)?;
        }
        let staging = path.with_extension("ini.tmp");
        std::fs::write(&staging, super::writer::to_config_string(self)).map_err(unwritable)?;
        std::fs::rename(&staging, path).map_err(unwritable)
    }
}

/// `~/.blockbatch`, or `./.blockbatch` without a home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blockbatch")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();

        assert_eq!(config.connection.host, DEFAULT_HOST);
        assert_eq!(config.connection.port, DEFAULT_PORT);
        assert!(config.connection.password.is_none());
        assert_eq!(config.executor.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.clear.operation_timeout, DEFAULT_OPERATION_TIMEOUT_SECS);
        assert!(config.clear.chunk_size.is_none());
    }

    #[test]
    fn test_edits_survive_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.connection.password = Some("hunter2".to_string());
        config.clear.chunk_size = Some(16);
        config.clear.checkpoint = Some(dir.path().join("progress.json"));
        config.save_to(&path).unwrap();

        assert!(!path.with_extension("ini.tmp").exists());
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.connection.password.as_deref(), Some("hunter2"));
        assert_eq!(loaded.clear.chunk_size, Some(16));
        assert_eq!(loaded.clear.checkpoint, config.clear.checkpoint);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[connection\nport = 1\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Unreadable { .. }));
        assert!(err.to_string().contains("config.ini"));
    }
}
