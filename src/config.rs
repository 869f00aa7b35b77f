//! Service configuration loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::infra::{CertificateError, Result, StorageConfig};
use crate::render::{ConverterConfig, DEFAULT_CONVERTER_TIMEOUT};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Token validation settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// If false, every request is treated as admin.
    pub require_auth: bool,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://` or `sqlite:` connection URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    pub migrate_on_startup: bool,
    pub storage: StorageConfig,
    /// `None` stores filled slide decks without PDF conversion.
    pub converter: Option<ConverterConfig>,
    pub auth: AuthConfig,
    /// Comma-separated origins or `*`
    pub cors_allow_origins: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/event_certs".to_string());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_var(&var, "PORT")?.unwrap_or(8080);
        let listen_addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
            CertificateError::Configuration(format!("invalid listen address {host}:{port}: {e}"))
        })?;

        let max_connections: u32 = parse_var(&var, "MAX_DB_CONNECTIONS")?.unwrap_or(10);
        let migrate_on_startup = flag(var("DB_MIGRATE_ON_STARTUP"), true);

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                root: PathBuf::from(
                    var("STORAGE_LOCAL_ROOT").unwrap_or_else(|| "./data/artifacts".to_string()),
                ),
                public_base_url: var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8080".to_string()),
            },
            "remote" => StorageConfig::Remote {
                base_url: var("STORAGE_REMOTE_URL").ok_or_else(|| {
                    CertificateError::Configuration(
                        "STORAGE_BACKEND=remote requires STORAGE_REMOTE_URL".to_string(),
                    )
                })?,
                bucket: var("STORAGE_BUCKET").ok_or_else(|| {
                    CertificateError::Configuration(
                        "STORAGE_BACKEND=remote requires STORAGE_BUCKET".to_string(),
                    )
                })?,
                token: var("STORAGE_TOKEN"),
            },
            other => {
                return Err(CertificateError::Configuration(format!(
                    "unknown STORAGE_BACKEND {other:?} (expected local or remote)"
                )))
            }
        };

        let converter = if flag(var("CONVERT_DOCUMENTS"), true) {
            let timeout = parse_var::<u64, _>(&var, "CONVERTER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONVERTER_TIMEOUT);
            Some(ConverterConfig {
                binary: var("CONVERTER_BINARY").map(PathBuf::from),
                timeout,
                work_root: None,
            })
        } else {
            None
        };

        let auth = AuthConfig {
            require_auth: var("AUTH_MODE").as_deref() != Some("disabled"),
            jwt_secret: var("JWT_SECRET"),
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "event-platform".to_string()),
            jwt_audience: var("JWT_AUDIENCE").unwrap_or_else(|| "event-certs".to_string()),
        };
        if auth.require_auth && auth.jwt_secret.is_none() {
            return Err(CertificateError::Configuration(
                "AUTH_MODE=required but JWT_SECRET is not set (AUTH_MODE=disabled for local dev)"
                    .to_string(),
            ));
        }

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            migrate_on_startup,
            storage,
            converter,
            auth,
            cors_allow_origins: var("CORS_ALLOW_ORIGINS"),
            log_format,
        })
    }

    pub fn is_sqlite(&self) -> bool {
        self.database_url.starts_with("sqlite:")
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| CertificateError::Configuration(format!("{key}={v:?}: {e}")))
        })
        .transpose()
}

fn flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/event_certs");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.max_connections, 10);
        assert!(config.migrate_on_startup);
        assert!(config.auth.require_auth);
        assert_eq!(config.auth.jwt_issuer, "event-platform");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.is_sqlite());

        let converter = config.converter.unwrap();
        assert_eq!(converter.timeout, DEFAULT_CONVERTER_TIMEOUT);
        assert!(converter.binary.is_none());

        match config.storage {
            StorageConfig::Local {
                root,
                public_base_url,
            } => {
                assert_eq!(root, PathBuf::from("./data/artifacts"));
                assert_eq!(public_base_url, "http://localhost:8080");
            }
            other => panic!("unexpected storage: {other:?}"),
        }
    }

    #[test]
    fn test_required_auth_needs_secret() {
        assert!(matches!(load(&[]), Err(CertificateError::Configuration(_))));

        let config = load(&[("AUTH_MODE", "disabled")]).unwrap();
        assert!(!config.auth.require_auth);
    }

    #[test]
    fn test_remote_storage_requires_endpoint() {
        let err = load(&[("AUTH_MODE", "disabled"), ("STORAGE_BACKEND", "remote")]);
        assert!(matches!(err, Err(CertificateError::Configuration(_))));

        let config = load(&[
            ("AUTH_MODE", "disabled"),
            ("STORAGE_BACKEND", "remote"),
            ("STORAGE_REMOTE_URL", "https://store.example.com/storage/v1"),
            ("STORAGE_BUCKET", "certificates"),
        ])
        .unwrap();
        assert!(matches!(config.storage, StorageConfig::Remote { token: None, .. }));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("AUTH_MODE", "disabled"),
            ("DATABASE_URL", "sqlite:certs.db"),
            ("PORT", "9090"),
            ("DB_MIGRATE_ON_STARTUP", "off"),
            ("CONVERTER_TIMEOUT_SECS", "30"),
            ("CONVERTER_BINARY", "/opt/office/soffice"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert!(config.is_sqlite());
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.migrate_on_startup);
        assert_eq!(config.log_format, LogFormat::Json);
        let converter = config.converter.unwrap();
        assert_eq!(converter.timeout, Duration::from_secs(30));
        assert_eq!(converter.binary, Some(PathBuf::from("/opt/office/soffice")));
    }

    #[test]
    fn test_conversion_can_be_disabled() {
        let config = load(&[("AUTH_MODE", "disabled"), ("CONVERT_DOCUMENTS", "false")]).unwrap();
        assert!(config.converter.is_none());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(load(&[("AUTH_MODE", "disabled"), ("PORT", "http")]).is_err());
        assert!(load(&[("AUTH_MODE", "disabled"), ("CONVERTER_TIMEOUT_SECS", "-1")]).is_err());
    }
}
