use std::fs;
use std::path::{Path, PathBuf};

use sqlferry_core::{APP_DIR_NAME, CONNECTIONS_FILE, ROLLBACK_HISTORY_FILE};
use thiserror::Error;

/// Overrides the data directory when set
pub const DATA_DIR_ENV: &str = "SQLFERRY_DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not determine a data directory: {0}")]
    DataDir(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where sqlferry keeps its JSON documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the data directory from the environment and create it
    ///
    /// `SQLFERRY_DATA_DIR` wins, then the platform data directory, then `~/.sqlferry`.
    pub fn resolve() -> ConfigResult<Self> {
        let data_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };
        Self::at(data_dir)
    }

    /// Use `data_dir` as is, creating it if needed
    pub fn at(data_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn connections_file(&self) -> PathBuf {
        self.data_dir.join(CONNECTIONS_FILE)
    }

    pub fn rollback_history_file(&self) -> PathBuf {
        self.data_dir.join(ROLLBACK_HISTORY_FILE)
    }
}

fn default_data_dir() -> ConfigResult<PathBuf> {
    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(APP_DIR_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(format!(".{}", APP_DIR_NAME)))
        .ok_or_else(|| ConfigError::DataDir("no home directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_at_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("sqlferry");

        let paths = AppPaths::at(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(paths.connections_file(), dir.join("connections.json"));
        assert_eq!(
            paths.rollback_history_file(),
            dir.join("rollback_history.json")
        );
    }

    #[test]
    fn test_default_dir_is_app_specific() {
        let dir = default_data_dir().unwrap();
        let last = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(last == "sqlferry" || last == ".sqlferry");
    }
}
