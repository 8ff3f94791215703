use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth_token: String,
    pub storage: StorageKind,
    pub host: String,
    pub port: u16,
    /// Prefix for the hosted references handed back to clients.
    pub public_url: String,
    pub upload_body_limit: usize,
    pub log_level: Level,
}

pub const DEFAULT_UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_token = lookup("AUTH_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("AUTH_TOKEN"))?;

        let storage_path = lookup("STORAGE_PATH").unwrap_or_else(|| "./uploads".to_string());
        let storage = match lookup("STORAGE_TYPE").as_deref().unwrap_or("memory") {
            "memory" => StorageKind::Memory,
            "local" => StorageKind::Local(PathBuf::from(storage_path)),
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_TYPE",
                    value: other.to_string(),
                });
            }
        };

        let port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            auth_token,
            storage,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            public_url,
            upload_body_limit: parse_or(&lookup, "UPLOAD_BODY_LIMIT", DEFAULT_UPLOAD_BODY_LIMIT)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", Level::INFO)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: addr,
        })
    }
}

/// Where the admin client finds the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_url = lookup("SHOPLOOP_API_URL")
            .unwrap_or(defaults.api_url)
            .trim_end_matches('/')
            .to_string();
        let timeout_secs: u64 = parse_or(&lookup, "SHOPLOOP_HTTP_TIMEOUT_SECS", defaults.timeout.as_secs())?;

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "t")])).unwrap();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_url, "http://localhost:8080");
        assert_eq!(config.upload_body_limit, DEFAULT_UPLOAD_BODY_LIMIT);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn auth_token_is_required() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("AUTH_TOKEN")
        );
    }

    #[test]
    fn local_storage_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AUTH_TOKEN", "t"),
            ("STORAGE_TYPE", "local"),
            ("STORAGE_PATH", "/srv/images"),
            ("PORT", "9000"),
            ("PUBLIC_URL", "https://assets.example.com/"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageKind::Local(PathBuf::from("/srv/images")));
        assert_eq!(config.public_url, "https://assets.example.com");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "t"), ("PORT", "eighty")])),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "t"), ("STORAGE_TYPE", "s3")])),
            Err(ConfigError::Invalid { key: "STORAGE_TYPE", .. })
        ));
    }

    #[test]
    fn client_config() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SHOPLOOP_API_URL", "https://shop.example.com/"),
            ("SHOPLOOP_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://shop.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(ClientConfig::from_lookup(lookup(&[])).unwrap(), ClientConfig::default());
    }
}
