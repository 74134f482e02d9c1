//! Path management for Spendwise
//!
//! ## Path Resolution Order
//!
//! 1. `SPENDWISE_DATA_DIR` environment variable (if set and non-empty)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/spendwise` or `~/.config/spendwise`
//! 3. Windows: `%APPDATA%\spendwise`

use std::path::{Path, PathBuf};

use crate::error::SpendwiseError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "SPENDWISE_DATA_DIR";

const APP_DIR: &str = "spendwise";

/// Manages all paths used by Spendwise
#[derive(Debug, Clone)]
pub struct SpendwisePaths {
    base_dir: PathBuf,
}

impl SpendwisePaths {
    /// Resolve the base directory from the environment
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if no home directory can be determined.
    pub fn new() -> Result<Self, SpendwiseError> {
        let base_dir = match non_empty_var(DATA_DIR_ENV) {
            Some(custom) => PathBuf::from(custom),
            None => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Use an explicit base directory
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/data/`
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Create the base and data directories
    pub fn ensure_directories(&self) -> Result<(), SpendwiseError> {
        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| SpendwiseError::Io(format!("Failed to create data directory: {}", e)))
    }

    /// Whether `init` has written a settings file here
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, SpendwiseError> {
    let config_base = match non_empty_var("XDG_CONFIG_HOME") {
        Some(xdg) => PathBuf::from(xdg),
        None => non_empty_var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .ok_or_else(|| SpendwiseError::Config("Could not determine home directory".into()))?,
    };
    Ok(config_base.join(APP_DIR))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, SpendwiseError> {
    let appdata = non_empty_var("APPDATA")
        .ok_or_else(|| SpendwiseError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(paths.audit_log(), temp_dir.path().join("audit.log"));
        assert_eq!(
            paths.transactions_file(),
            temp_dir.path().join("data").join("transactions.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().join("fresh"));

        assert!(!paths.is_initialized());
        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().is_dir());
    }
}
