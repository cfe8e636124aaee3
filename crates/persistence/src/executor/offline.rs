use async_trait::async_trait;
use tracing::debug;

use crate::core::BackendKind;
use crate::error::BackendError;
use crate::failover::ConnectionSnapshot;
use crate::types::{QueryResult, SqlValue};

use super::QueryExecutor;

/// Executor used when no endpoint could be built at startup.
///
/// Reports itself as never connected and answers every statement with its
/// neutral result.
#[derive(Debug, Clone, Default)]
pub struct OfflineExecutor {
    reason: Option<String>,
}

impl OfflineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records why the process is running without a database.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

#[async_trait]
impl QueryExecutor for OfflineExecutor {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> QueryResult {
        debug!(params = params.len(), "Offline, returning neutral result");
        QueryResult::neutral_for(sql)
    }

    fn connection_state(&self) -> ConnectionSnapshot {
        ConnectionSnapshot::offline()
    }

    async fn probe_now(&self) -> ConnectionSnapshot {
        ConnectionSnapshot::offline()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Offline
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        Err(BackendError::Unavailable {
            backend_name: "offline".to_string(),
            message: self
                .reason
                .clone()
                .unwrap_or_else(|| "no database configured".to_string()),
        })
    }
}
