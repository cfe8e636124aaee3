//! Query execution that always answers.
//!
//! A [`QueryExecutor`] takes one SQL statement with `?` placeholders and an
//! ordered parameter list and returns a [`QueryResult`]. Failures of any kind
//! (no reachable endpoint, a statement error, a parameter count mismatch)
//! resolve to the neutral result for the statement:
//!
//! - an empty row list for statements starting with `select`
//! - `{affectedRows: 0, insertId: 0}` for everything else
//!
//! Two implementations exist:
//!
//! | Executor | Use |
//! |----------|-----|
//! | [`PooledExecutor`] | primary/backup endpoints with lazy probing and one recovery attempt |
//! | [`OfflineExecutor`] | no database could be configured; every statement is neutral |

mod offline;
mod pooled;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::core::BackendKind;
use crate::error::BackendError;
use crate::failover::ConnectionSnapshot;
use crate::types::{QueryResult, SqlValue};

pub use offline::OfflineExecutor;
pub use pooled::PooledExecutor;

/// Runs single statements and never returns an error to the caller.
#[async_trait]
pub trait QueryExecutor: Send + Sync + Debug {
    /// Runs one statement. Failures resolve to [`QueryResult::neutral_for`].
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> QueryResult;

    /// Runs a statement with no parameters.
    async fn query(&self, sql: &str) -> QueryResult {
        self.execute(sql, Vec::new()).await
    }

    /// The connectivity state as last recorded.
    fn connection_state(&self) -> ConnectionSnapshot;

    /// Probes the endpoints now and returns the resulting state.
    async fn probe_now(&self) -> ConnectionSnapshot;

    /// Kind of the backend behind this executor.
    fn kind(&self) -> BackendKind;

    /// Creates the application tables on every endpoint that answers.
    async fn init_schema(&self) -> Result<(), BackendError>;
}
