//! Backend abstraction for database drivers.
//!
//! A [`SqlBackend`] owns one connection pool for one endpoint. Connections
//! are handed out as boxed [`SqlConnection`]s; dropping one returns it to
//! its pool, so a connection cannot outlive the scope that acquired it.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::BackendError;
use crate::types::{QueryResult, SqlValue};

/// Identifies the type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// PostgreSQL database.
    Postgres,
    /// No database; every statement resolves to its neutral result.
    Offline,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::Offline => write!(f, "offline"),
        }
    }
}

/// Connection pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    /// Upper bound on connections.
    pub max_size: u32,
    /// Connections currently open.
    pub size: u32,
    /// Open connections not checked out.
    pub idle: u32,
}

/// A pooled database endpoint.
#[async_trait]
pub trait SqlBackend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Where this backend points, without credentials.
    fn endpoint(&self) -> String;

    /// Current pool occupancy.
    fn pool_stats(&self) -> PoolStats;

    /// Acquires a connection from the pool.
    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, BackendError>;

    /// Acquires a connection, runs `SELECT 1`, and releases it.
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.acquire().await?;
        conn.query("SELECT 1").await?;
        Ok(())
    }

    /// Creates the application tables if they do not exist.
    async fn init_schema(&self) -> Result<(), BackendError>;
}

/// A connection checked out of a [`SqlBackend`] pool.
#[async_trait]
pub trait SqlConnection: Send {
    /// Runs a parameterised statement.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError>;

    /// Runs a statement as-is, with no parameter binding.
    async fn query(&mut self, sql: &str) -> Result<QueryResult, BackendError>;
}
