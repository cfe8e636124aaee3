//! Database configuration.
//!
//! [`DatabaseConfig`] describes the primary endpoint, the optional backup
//! endpoint, and executor behaviour. The backup endpoint shares the primary's
//! credentials and database name and differs only by host (PostgreSQL) or
//! file path (SQLite). It is disabled unless one of those is set.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The database engine behind both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    /// SQLite file (or `:memory:`) databases.
    #[default]
    Sqlite,
    /// PostgreSQL servers.
    Postgres,
}

impl DatabaseEngine {
    /// Default server port for network engines.
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Sqlite => 0,
            DatabaseEngine::Postgres => 5432,
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseEngine::Sqlite => write!(f, "sqlite"),
            DatabaseEngine::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseEngine::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(DatabaseEngine::Postgres),
            other => Err(format!(
                "unknown database engine '{}', expected sqlite or postgres",
                other
            )),
        }
    }
}

/// What the executor does after a statement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// Re-issue the same parameterised statement on a fresh connection.
    #[default]
    Rebind,
    /// Substitute parameters into the statement text and run the literal
    /// statement on a fresh connection. Diagnostic use only.
    Inline,
    /// Do not retry.
    Disabled,
}

impl fmt::Display for RecoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryMode::Rebind => write!(f, "rebind"),
            RecoveryMode::Inline => write!(f, "inline"),
            RecoveryMode::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for RecoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rebind" => Ok(RecoveryMode::Rebind),
            "inline" => Ok(RecoveryMode::Inline),
            "disabled" | "off" | "none" => Ok(RecoveryMode::Disabled),
            other => Err(format!(
                "unknown recovery mode '{}', expected rebind, inline or disabled",
                other
            )),
        }
    }
}

/// Connection settings for one endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Server host (PostgreSQL).
    pub host: String,
    /// Server port (PostgreSQL).
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub database: String,
    /// SQLite database file.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
}

impl EndpointConfig {
    /// Display form of the endpoint with no credentials.
    pub fn describe(&self, engine: DatabaseEngine) -> String {
        match engine {
            DatabaseEngine::Sqlite => format!("sqlite://{}", self.path),
            DatabaseEngine::Postgres => {
                format!("postgres://{}:{}/{}", self.host, self.port, self.database)
            }
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("path", &self.path)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Database settings for the whole process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub engine: DatabaseEngine,

    #[serde(default = "default_host")]
    pub host: String,

    /// Server port; the engine default when absent.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    #[serde(default = "default_name")]
    pub name: String,

    /// SQLite database file for the primary endpoint.
    #[serde(default = "default_path")]
    pub path: String,

    /// Backup server host (PostgreSQL).
    #[serde(default)]
    pub backup_host: Option<String>,

    /// Backup database file (SQLite).
    #[serde(default)]
    pub backup_path: Option<String>,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_backup_pool_size")]
    pub backup_pool_size: u32,

    /// Bound on connection establishment, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Interval between background probes, in seconds.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    #[serde(default)]
    pub recovery: RecoveryMode,

    /// Convert digit-only text parameters to integers before binding.
    #[serde(default = "default_true")]
    pub coerce_numeric_strings: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "HYTT".to_string()
}

fn default_name() -> String {
    "hytt".to_string()
}

fn default_path() -> String {
    "hytt.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_backup_pool_size() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::default(),
            host: default_host(),
            port: None,
            user: default_user(),
            password: String::new(),
            name: default_name(),
            path: default_path(),
            backup_host: None,
            backup_path: None,
            pool_size: default_pool_size(),
            backup_pool_size: default_backup_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            recovery: RecoveryMode::default(),
            coerce_numeric_strings: true,
        }
    }
}

impl DatabaseConfig {
    /// A SQLite configuration for the given primary file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: DatabaseEngine::Sqlite,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the backup SQLite file.
    pub fn with_backup_path(mut self, path: impl Into<String>) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    /// Sets the connect timeout in seconds.
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Sets the recovery mode.
    pub fn with_recovery(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Effective server port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    /// Settings for the primary endpoint.
    pub fn primary_endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            host: self.host.clone(),
            port: self.port(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.name.clone(),
            path: self.path.clone(),
            pool_size: self.pool_size,
            connect_timeout: self.connect_timeout(),
        }
    }

    /// Settings for the backup endpoint, if one is configured for the engine.
    pub fn backup_endpoint(&self) -> Option<EndpointConfig> {
        let mut endpoint = self.primary_endpoint();
        endpoint.pool_size = self.backup_pool_size;
        match self.engine {
            DatabaseEngine::Sqlite => {
                endpoint.path = self.backup_path.clone().filter(|p| !p.is_empty())?;
            }
            DatabaseEngine::Postgres => {
                endpoint.host = self.backup_host.clone().filter(|h| !h.is_empty())?;
            }
        }
        Some(endpoint)
    }

    /// Checks that the configuration can produce endpoints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.backup_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backup_pool_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe_interval_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        match self.engine {
            DatabaseEngine::Sqlite if self.path.is_empty() => Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                message: "cannot be empty".to_string(),
            }),
            DatabaseEngine::Postgres if self.host.is_empty() => Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                message: "cannot be empty".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
