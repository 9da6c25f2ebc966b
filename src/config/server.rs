use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

const DB_FILE_NAME: &str = "pantry-raider.db";
const ADMIN_TOKEN_FILE_NAME: &str = ".admin_token";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Upper bound on a single store call made on behalf of a request.
    pub store_timeout_ms: u64,
    /// Public base URL for external access (e.g., "https://pantry.example.com").
    pub public_base_url: Option<String>,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_timeout_ms == 0 {
            return Err(Error::Config(
                "store_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(url) = &self.public_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "public_base_url must start with http:// or https://, got '{url}'"
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    #[must_use]
    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join(ADMIN_TOKEN_FILE_NAME)
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            store_timeout_ms: 5000,
            public_base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.db_path(), PathBuf::from("./data/pantry-raider.db"));
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml("port = 9090\ndata_dir = \"/srv/pantry\"\n").unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path(), PathBuf::from("/srv/pantry/pantry-raider.db"));
        assert_eq!(config.store_timeout_ms, 5000);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = ServerConfig::from_toml("prot = 9090\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ServerConfig::from_toml("store_timeout_ms = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("pantry.toml");
        std::fs::write(
            &path,
            "host = \"0.0.0.0\"\npublic_base_url = \"https://pantry.example.com\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://pantry.example.com")
        );
    }
}
