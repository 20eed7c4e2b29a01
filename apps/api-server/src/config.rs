//! Centralized configuration for api-server.
//!
//! A `.env` file, if present, is loaded by `main` before this runs. All
//! variables are then read and validated once at startup to fail fast on
//! misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5000";
const DEFAULT_DB_PATH: &str = "./data/links.db";
const MIN_CODE_LENGTH: usize = 4;
const MAX_CODE_LENGTH: usize = 32;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("memory") {
            Self::Memory
        } else {
            Self::Sqlite
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
#[error("Configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 5000)
    pub port: u16,
    /// Browser origins allowed by CORS. Requests without an Origin header
    /// are never blocked.
    pub cors_allowed_origins: Vec<HeaderValue>,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: PathBuf,
    /// Log format
    pub log_format: LogFormat,
    /// Length of generated short codes
    pub code_length: usize,
    /// Fresh codes tried before shortening gives up on collisions
    pub code_max_attempts: u32,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match var("PORT") {
            Some(s) => s.trim().parse().map_err(|e| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}': {}", s, e),
            })?,
            None => DEFAULT_PORT,
        };

        let cors_allowed_origins =
            parse_origins(&var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ORIGINS.into()))?;

        let storage_provider =
            StorageProvider::from_str(&var("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()));

        let db_path = var("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let log_format =
            LogFormat::from_str(&var("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        let code_length = match var("CODE_LENGTH") {
            Some(s) => {
                let n: usize = s.trim().parse().map_err(|e| ConfigError {
                    field: "CODE_LENGTH",
                    message: format!("Invalid number '{}': {}", s, e),
                })?;
                if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&n) {
                    return Err(ConfigError {
                        field: "CODE_LENGTH",
                        message: format!(
                            "Must be between {} and {}, got {}",
                            MIN_CODE_LENGTH, MAX_CODE_LENGTH, n
                        ),
                    });
                }
                n
            }
            None => domain::codegen::DEFAULT_CODE_LENGTH,
        };

        let code_max_attempts = match var("CODE_MAX_ATTEMPTS") {
            Some(s) => {
                let n: u32 = s.trim().parse().map_err(|e| ConfigError {
                    field: "CODE_MAX_ATTEMPTS",
                    message: format!("Invalid number '{}': {}", s, e),
                })?;
                if n == 0 {
                    return Err(ConfigError {
                        field: "CODE_MAX_ATTEMPTS",
                        message: "Must be at least 1".into(),
                    });
                }
                n
            }
            None => domain::service::DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            port,
            cors_allowed_origins,
            storage_provider,
            db_path,
            log_format,
            code_length,
            code_max_attempts,
        })
    }

    /// Log warnings about configurations that lose data.
    pub fn warn_if_ephemeral(&self) {
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!(
                "STORAGE_PROVIDER=memory: links are kept in process memory and lost on restart."
            );
        }
        #[cfg(not(feature = "sqlite"))]
        {
            if self.storage_provider == StorageProvider::Sqlite {
                tracing::warn!(
                    "STORAGE_PROVIDER=sqlite but api-server was built without the `sqlite` \
                     feature; falling back to in-memory storage."
                );
            }
        }
    }
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| ConfigError {
                field: "CORS_ALLOWED_ORIGINS",
                message: format!("Invalid header value '{}': {}", origin, e),
            })
        })
        .collect()
}
