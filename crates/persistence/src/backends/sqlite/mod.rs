//! SQLite backend implementation.
//!
//! Supports in-memory databases (handy for tests) and file-based databases
//! for development and small deployments. A backup endpoint is simply a
//! second database file.
//!
//! # Example
//!
//! ```no_run
//! use hytt_persistence::backends::sqlite::SqliteBackend;
//! use hytt_persistence::core::SqlBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./data/hytt.db")?;
//! backend.init_schema().await?;
//! backend.ping().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Timestamps are stored as `TEXT` in `YYYY-MM-DD HH:MM:SS` form.

mod backend;
mod schema;

pub use backend::{SqliteBackend, SqliteBackendConfig, SqlitePooledConnection};
pub use schema::SCHEMA_VERSION;
