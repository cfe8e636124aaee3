//! PostgreSQL backend implementation.
//!
//! Connection pooling via deadpool-postgres. Statements are written with `?`
//! placeholders and rewritten to `$n` before they reach the server.
//!
//! # Example
//!
//! ```no_run
//! use hytt_persistence::backends::postgres::{PostgresBackend, PostgresConfig};
//! use hytt_persistence::core::SqlBackend;
//!
//! # async fn main_example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = PostgresBackend::new(PostgresConfig::default())?;
//! backend.init_schema().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod schema;

pub use backend::{PostgresBackend, PostgresConfig, PostgresConnection};
pub use schema::SCHEMA_VERSION;
