//! HYTT Persistence Layer
//!
//! Query execution for the HYTT booking backend over a primary and an
//! optional backup database, with a short-lived response cache.
//!
//! # Features
//!
//! - **Failover**: a background prober decides which endpoint serves queries
//! - **Always-answer execution**: every statement yields rows or a mutation
//!   result; failures resolve to the neutral result for the statement
//! - **Response cache**: TTL map of JSON responses with explicit invalidation
//!
//! # Backend Features
//!
//! ```toml
//! [dependencies]
//! hytt-persistence = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//! - `postgres` - PostgreSQL via deadpool
//!
//! # Architecture
//!
//! - [`types`] - bind parameters and statement results
//! - [`sql`] - placeholder scanning and rewriting
//! - [`core`] - backend and connection traits
//! - [`backends`] - SQLite and PostgreSQL pools
//! - [`failover`] - endpoint set, connection state and health prober
//! - [`executor`] - the pooled and offline query executors
//! - [`cache`] - response cache
//! - [`config`] - database configuration
//! - [`seed`] - default notice content
//!
//! # Quick Start
//!
//! ```no_run
//! use hytt_persistence::config::DatabaseConfig;
//! use hytt_persistence::executor::{PooledExecutor, QueryExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::sqlite("hytt.db").with_backup_path("hytt-backup.db");
//! let executor = PooledExecutor::from_config(&config)?;
//! executor.init_schema().await?;
//!
//! let users = executor
//!     .execute("SELECT * FROM users WHERE id = ?", vec!["1".into()])
//!     .await;
//! println!("{} rows", users.rows().len());
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod failover;
pub mod seed;
pub mod sql;
pub mod types;

pub use cache::ResponseCache;
pub use config::{DatabaseConfig, DatabaseEngine, RecoveryMode};
pub use core::{BackendKind, SqlBackend, SqlConnection};
pub use error::{BackendError, BackendResult, ConfigError};
pub use executor::{OfflineExecutor, PooledExecutor, QueryExecutor};
pub use failover::{ConnectionSnapshot, ConnectionState, EndpointRole, EndpointSet, HealthProber};
pub use types::{MutationResult, QueryResult, Row, SqlValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
