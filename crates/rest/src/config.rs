//! Server configuration for the booking REST API.
//!
//! Every field can be given on the command line or through the environment.
//! Database settings are converted into a [`DatabaseConfig`] for the
//! persistence layer with [`ServerConfig::database_config`].
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REST_SERVER_PORT` | 3000 | Server port |
//! | `REST_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `REST_LOG_LEVEL` | info | Log level |
//! | `REST_REQUEST_TIMEOUT` | 60 | Request timeout (seconds) |
//! | `REST_ENABLE_CORS` | true | Enable CORS |
//! | `REST_CORS_ORIGINS` | * | Allowed origins |
//! | `REST_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `REST_CORS_HEADERS` | Content-Type,Authorization,X-Requested-With,Cache-Control | Allowed headers |
//! | `REST_CORS_MAX_AGE` | 86400 | Preflight cache lifetime (seconds) |
//! | `REST_STATIC_DIR` | - | Directory served under `/static` |
//! | `DB_ENGINE` | sqlite | `sqlite` or `postgres` |
//! | `DB_HOST` | localhost | Primary server host |
//! | `DB_PORT` | engine default | Server port |
//! | `DB_USER` | HYTT | Login user |
//! | `DB_PASSWORD` | - | Login password |
//! | `DB_NAME` | hytt | Database name |
//! | `DB_PATH` | hytt.db | Primary SQLite file |
//! | `DB_BACKUP_HOST` | - | Backup server host |
//! | `DB_BACKUP_PATH` | - | Backup SQLite file |
//! | `DB_POOL_SIZE` | 10 | Primary pool size |
//! | `DB_BACKUP_POOL_SIZE` | 5 | Backup pool size |
//! | `DB_CONNECT_TIMEOUT` | 10 | Connect timeout (seconds) |
//! | `DB_PROBE_INTERVAL` | 30 | Health probe interval (seconds) |
//! | `DB_RECOVERY` | rebind | `rebind`, `inline` or `disabled` |
//! | `DB_COERCE_NUMERIC_STRINGS` | true | Bind digit-only strings as integers |
//! | `NOTICE_LIST_TTL` | 180 | Notice list cache lifetime (seconds) |
//! | `NOTICE_DETAIL_TTL` | 300 | Notice detail cache lifetime (seconds) |
//! | `BANNER_LIST_TTL` | 1800 | Banner list cache lifetime (seconds) |
//! | `CACHE_CHECK_PERIOD` | 60 | Expired entry sweep period (seconds) |
//!
//! # Example
//!
//! ```rust
//! use hytt_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 8080,
//!     db_path: "/var/lib/hytt/hytt.db".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "127.0.0.1:8080");
//! ```

use std::time::Duration;

use clap::Parser;
use hytt_persistence::config::{DatabaseConfig, DatabaseEngine, RecoveryMode};

/// Server configuration for the booking REST API.
#[derive(Debug, Clone, Parser)]
#[command(name = "hytt")]
#[command(about = "HYTT booking API server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "REST_SERVER_PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "REST_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "REST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    ///
    /// Must exceed two probes over every endpoint, since a request on a
    /// disconnected database can wait for that long.
    #[arg(long, env = "REST_REQUEST_TIMEOUT", default_value = "60")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "REST_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "REST_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "REST_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "REST_CORS_HEADERS",
        default_value = "Content-Type,Authorization,X-Requested-With,Cache-Control"
    )]
    pub cors_headers: String,

    /// How long browsers may cache a preflight response, in seconds.
    #[arg(long, env = "REST_CORS_MAX_AGE", default_value = "86400")]
    pub cors_max_age: u64,

    /// Directory served under `/static`.
    #[arg(long, env = "REST_STATIC_DIR")]
    pub static_dir: Option<String>,

    /// Database engine.
    #[arg(long, env = "DB_ENGINE", default_value = "sqlite")]
    pub db_engine: DatabaseEngine,

    /// Primary database host.
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database port. Defaults to the engine's standard port.
    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<u16>,

    #[arg(long, env = "DB_USER", default_value = "HYTT")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "hytt")]
    pub db_name: String,

    /// Primary SQLite database file.
    #[arg(long, env = "DB_PATH", default_value = "hytt.db")]
    pub db_path: String,

    /// Backup database host. The backup endpoint is disabled when unset.
    #[arg(long, env = "DB_BACKUP_HOST")]
    pub db_backup_host: Option<String>,

    /// Backup SQLite database file. The backup endpoint is disabled when unset.
    #[arg(long, env = "DB_BACKUP_PATH")]
    pub db_backup_path: Option<String>,

    #[arg(long, env = "DB_POOL_SIZE", default_value = "10")]
    pub db_pool_size: u32,

    #[arg(long, env = "DB_BACKUP_POOL_SIZE", default_value = "5")]
    pub db_backup_pool_size: u32,

    /// Connection establishment timeout in seconds.
    #[arg(long, env = "DB_CONNECT_TIMEOUT", default_value = "10")]
    pub db_connect_timeout: u64,

    /// Seconds between background health probes.
    #[arg(long, env = "DB_PROBE_INTERVAL", default_value = "30")]
    pub db_probe_interval: u64,

    /// What to do after a statement fails (rebind, inline, disabled).
    #[arg(long, env = "DB_RECOVERY", default_value = "rebind")]
    pub db_recovery: RecoveryMode,

    /// Bind digit-only string parameters as integers.
    #[arg(long, env = "DB_COERCE_NUMERIC_STRINGS", default_value = "true")]
    pub db_coerce_numeric_strings: bool,

    /// Create missing tables at startup.
    #[arg(long, env = "DB_INIT_SCHEMA")]
    pub init_schema: bool,

    /// Insert the default notices at startup.
    #[arg(long, env = "DB_SEED_NOTICES")]
    pub seed_notices: bool,

    /// Lifetime of cached notice pages, in seconds.
    #[arg(long, env = "NOTICE_LIST_TTL", default_value = "180")]
    pub notice_list_ttl: u64,

    /// Lifetime of cached notice details, in seconds.
    #[arg(long, env = "NOTICE_DETAIL_TTL", default_value = "300")]
    pub notice_detail_ttl: u64,

    /// Lifetime of the cached banner list, in seconds.
    #[arg(long, env = "BANNER_LIST_TTL", default_value = "1800")]
    pub banner_list_ttl: u64,

    /// Seconds between sweeps of expired cache entries.
    #[arg(long, env = "CACHE_CHECK_PERIOD", default_value = "60")]
    pub cache_check_period: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let db = DatabaseConfig::default();
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 60,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,X-Requested-With,Cache-Control".to_string(),
            cors_max_age: 86_400,
            static_dir: None,
            db_engine: db.engine,
            db_host: db.host,
            db_port: db.port,
            db_user: db.user,
            db_password: db.password,
            db_name: db.name,
            db_path: db.path,
            db_backup_host: None,
            db_backup_path: None,
            db_pool_size: db.pool_size,
            db_backup_pool_size: db.backup_pool_size,
            db_connect_timeout: db.connect_timeout_secs,
            db_probe_interval: db.probe_interval_secs,
            db_recovery: db.recovery,
            db_coerce_numeric_strings: db.coerce_numeric_strings,
            init_schema: false,
            seed_notices: false,
            notice_list_ttl: 180,
            notice_detail_ttl: 300,
            banner_list_ttl: 1800,
            cache_check_period: 60,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The persistence layer's view of the database settings.
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            engine: self.db_engine,
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            name: self.db_name.clone(),
            path: self.db_path.clone(),
            backup_host: self.db_backup_host.clone(),
            backup_path: self.db_backup_path.clone(),
            pool_size: self.db_pool_size,
            backup_pool_size: self.db_backup_pool_size,
            connect_timeout_secs: self.db_connect_timeout,
            probe_interval_secs: self.db_probe_interval,
            recovery: self.db_recovery,
            coerce_numeric_strings: self.db_coerce_numeric_strings,
        }
    }

    pub fn notice_list_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_list_ttl)
    }

    pub fn notice_detail_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_detail_ttl)
    }

    pub fn banner_list_ttl(&self) -> Duration {
        Duration::from_secs(self.banner_list_ttl)
    }

    pub fn cache_check_period(&self) -> Duration {
        Duration::from_secs(self.cache_check_period)
    }

    /// Longest a request can spend probing before its statements give up:
    /// two probes, each waiting out the connect timeout on every endpoint.
    fn worst_case_probe_secs(&self) -> u64 {
        let endpoints = if self.database_config().backup_endpoint().is_some() {
            2
        } else {
            1
        };
        2 * endpoints * self.db_connect_timeout
    }

    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        } else if self.request_timeout <= self.worst_case_probe_secs() {
            errors.push(format!(
                "request_timeout ({}s) must exceed {}s, two probes over every endpoint at db_connect_timeout",
                self.request_timeout,
                self.worst_case_probe_secs()
            ));
        }

        if self.cache_check_period == 0 {
            errors.push("Cache check period cannot be 0".to_string());
        }

        if let Err(e) = self.database_config().validate() {
            errors.push(format!("Database configuration: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses an in-memory SQLite primary, no backup, and CORS off.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 5,
            enable_cors: false,
            db_path: ":memory:".to_string(),
            db_connect_timeout: 2,
            ..Default::default()
        }
    }
}
