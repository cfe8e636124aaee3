//! Database backend implementations.
//!
//! Each backend is gated behind a feature flag.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` | Embedded database, great for development and tests |
//! | PostgreSQL | `postgres` | Network RDBMS for deployments with a standby server |

use std::sync::Arc;

use crate::config::{DatabaseEngine, EndpointConfig};
use crate::core::SqlBackend;
use crate::error::ConfigError;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

/// Builds the backend for one endpoint.
///
/// Pools connect lazily, so this only fails on configuration problems or
/// when the engine was not compiled in.
pub fn connect(
    engine: DatabaseEngine,
    endpoint: &EndpointConfig,
) -> Result<Arc<dyn SqlBackend>, ConfigError> {
    match engine {
        #[cfg(feature = "sqlite")]
        DatabaseEngine::Sqlite => Ok(Arc::new(sqlite::SqliteBackend::from_endpoint(endpoint)?)),
        #[cfg(feature = "postgres")]
        DatabaseEngine::Postgres => Ok(Arc::new(postgres::PostgresBackend::from_endpoint(
            endpoint,
        )?)),
        #[allow(unreachable_patterns)]
        other => {
            let _ = endpoint;
            Err(ConfigError::EngineNotEnabled {
                engine: other.to_string(),
            })
        }
    }
}
