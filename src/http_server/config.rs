//! Broker Configuration
//!
//! Bind address, Basic-auth credential pair, optional data directory for
//! the file-backed store, and CORS origins. Loadable from a JSON file by
//! the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Broker server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8844)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Basic auth username every request must present
    #[serde(default = "default_username")]
    pub username: String,

    /// Basic auth password. The default exists for local development only.
    #[serde(default = "default_password")]
    pub password: String,

    /// Data directory for the file-backed store; in-memory when absent
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// CORS allowed origins (permissive when empty, for development)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8844
}

fn default_username() -> String {
    "broker".to_string()
}

fn default_password() -> String {
    "change-me".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: default_password(),
            data_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl BrokerConfig {
    /// Read configuration from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8844);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = BrokerConfig {
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_load_applies_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.json");
        std::fs::write(&path, r#"{"port": 9001, "password": "pw"}"#).unwrap();

        let config = BrokerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.password, "pw");
        assert_eq!(config.username, "broker");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(BrokerConfig::load(&path).is_err());
    }
}
