//! Client/server configuration
//!
//! Both the server runner and the client subcommands read the listen
//! address from `~/.config/depot/config.yaml`:
//!
//! ```yaml
//! server:
//!   host: 127.0.0.1
//!   port: 8742
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// none is given. A missing file is a hard error - the service has no
    /// usable defaults to fall back to.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            return Err(CliError::config(format!(
                "Config file '{}' is not found",
                path.display()
            )));
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            CliError::config(format!("Invalid config '{}': {e}", path.display()))
        })
    }

    /// Get the default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("depot").join("config.yaml"))
    }

    /// Base URL of the configured server
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }

    /// Listen address for the server runner
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "server:\n  host: 127.0.0.1\n  port: 8742\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8742);
        assert_eq!(config.base_url(), "http://127.0.0.1:8742");
        assert_eq!(config.listen_addr(), "127.0.0.1:8742");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.exit_code(), crate::exit_codes::ERROR);
    }

    #[test]
    fn test_garbage_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "server: [not, a, mapping]\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(CliError::Config { .. })
        ));
    }
}
