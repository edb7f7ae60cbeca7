//! # Configuration
//!
//! Optional TOML file with `[storage]`, `[server]` and `[auth]` sections.
//!
//! ```toml
//! [storage]
//! database = "skillpath.db"
//! backend = "redb"          # or "memory"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:3000"]
//! rate_limit = 100          # requests per second, 0 disables
//!
//! [auth]
//! api_key = "secret"
//! ```
//!
//! Precedence: CLI flag > environment > file > built-in default.
//! Environment variables:
//! - `SKILLPATH_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `SKILLPATH_RATE_LIMIT`: requests per second
//! - `SKILLPATH_API_KEY`: bearer token required on every route but `/health`

use serde::{Deserialize, Serialize};
use skillpath_core::SkillError;
use std::path::{Path, PathBuf};

pub const ENV_CORS_ORIGINS: &str = "SKILLPATH_CORS_ORIGINS";
pub const ENV_RATE_LIMIT: &str = "SKILLPATH_RATE_LIMIT";
pub const ENV_API_KEY: &str = "SKILLPATH_API_KEY";

pub const DEFAULT_DATABASE: &str = "skillpath.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
/// Requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// BACKEND
// =============================================================================

/// Which store backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Disk-backed redb database.
    #[default]
    Redb,
    /// Volatile in-memory store.
    Memory,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(SkillError::InvalidRecord(format!(
                "Unknown backend: {other}. Use: redb, memory"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FILE SECTIONS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
    pub rate_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

/// Contents of the TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

impl FileConfig {
    /// Parse a config document.
    pub fn parse(content: &str) -> Result<Self, SkillError> {
        toml::from_str(content)
            .map_err(|e| SkillError::InvalidRecord(format!("Invalid config file: {e}")))
    }

    /// Read the config file at `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, SkillError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            SkillError::StoreUnavailable(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SkillError::InvalidRecord(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SkillError::StoreUnavailable(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsOrigins {
    /// localhost:3000 and localhost:8080 only.
    #[default]
    Localhost,
    /// Any origin. Development only.
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse_env(raw: &str) -> Self {
        if raw.trim() == "*" {
            return Self::Any;
        }
        Self::from_list(raw.split(',').map(str::to_string).collect())
    }

    fn from_list(origins: Vec<String>) -> Self {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        match origins.as_slice() {
            [] => Self::Localhost,
            [only] if only == "*" => Self::Any,
            _ => Self::List(origins),
        }
    }
}

/// HTTP hardening settings after applying precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub cors_origins: CorsOrigins,
    /// Requests per second; 0 disables limiting.
    pub rate_limit: u32,
    pub api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            cors_origins: CorsOrigins::Localhost,
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
        }
    }
}

impl ServerSettings {
    /// Environment over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(&FileConfig::default(), |key| std::env::var(key).ok())
    }

    /// Environment over file over defaults, reading variables through `env`.
    pub fn resolve(file: &FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let cors_origins = match env(ENV_CORS_ORIGINS) {
            Some(raw) => CorsOrigins::parse_env(&raw),
            None => file
                .server
                .cors_origins
                .clone()
                .map(CorsOrigins::from_list)
                .unwrap_or_default(),
        };

        let rate_limit = env(ENV_RATE_LIMIT)
            .and_then(|raw| match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring invalid {}", ENV_RATE_LIMIT);
                    None
                }
            })
            .or(file.server.rate_limit)
            .unwrap_or(DEFAULT_RATE_LIMIT);

        let api_key = env(ENV_API_KEY).or_else(|| {
            file.auth
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
        });

        Self {
            cors_origins,
            rate_limit,
            api_key,
        }
    }
}

/// Storage location after applying precedence (flag > file > default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub database: PathBuf,
    pub backend: Backend,
}

impl StorageSettings {
    #[must_use]
    pub fn resolve(
        file: &FileConfig,
        database_flag: Option<PathBuf>,
        backend_flag: Option<Backend>,
    ) -> Self {
        Self {
            database: database_flag
                .or_else(|| file.storage.database.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            backend: backend_flag.or(file.storage.backend).unwrap_or_default(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
