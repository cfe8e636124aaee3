use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{DatabaseConfig, RecoveryMode};
use crate::core::{BackendKind, SqlConnection};
use crate::error::{BackendError, ConfigError};
use crate::failover::{ConnectionSnapshot, Endpoint, EndpointSet, HealthProber};
use crate::sql;
use crate::types::{QueryResult, SqlValue, coerce_numeric_strings};

use super::QueryExecutor;

/// Executor over a primary and an optional backup endpoint.
///
/// Each statement:
///
/// 1. has digit-only text parameters coerced to integers (when enabled),
/// 2. triggers one probe if the state says no endpoint is connected,
/// 3. resolves to the neutral result if there is still no connection,
/// 4. runs on a connection from the active endpoint's pool, bound when the
///    statement has a placeholder and parameters were given, raw otherwise,
///    and resolves to the neutral result if no connection can be acquired,
/// 5. on an execution failure gets one recovery attempt on a fresh
///    connection, according to the [`RecoveryMode`], and
/// 6. resolves to the neutral result if that fails too.
///
/// Connections are dropped before recovery starts and on every return path.
#[derive(Debug)]
pub struct PooledExecutor {
    endpoints: Arc<EndpointSet>,
    prober: Arc<HealthProber>,
    recovery: RecoveryMode,
    coerce_numeric_strings: bool,
}

impl PooledExecutor {
    /// Creates an executor with [`RecoveryMode::Rebind`] and coercion on.
    pub fn new(endpoints: Arc<EndpointSet>, prober: Arc<HealthProber>) -> Self {
        Self {
            endpoints,
            prober,
            recovery: RecoveryMode::default(),
            coerce_numeric_strings: true,
        }
    }

    /// Builds endpoints and a prober from configuration.
    ///
    /// Pools connect lazily, so an unreachable database does not fail here.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        let endpoints = Arc::new(EndpointSet::from_config(config)?);
        let prober = Arc::new(HealthProber::new(
            endpoints.clone(),
            config.connect_timeout(),
        ));
        Ok(Self::new(endpoints, prober)
            .with_recovery(config.recovery)
            .with_coercion(config.coerce_numeric_strings))
    }

    pub fn with_recovery(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_coercion(mut self, enabled: bool) -> Self {
        self.coerce_numeric_strings = enabled;
        self
    }

    pub fn endpoints(&self) -> &Arc<EndpointSet> {
        &self.endpoints
    }

    /// The prober shared with the background loop.
    pub fn prober(&self) -> &Arc<HealthProber> {
        &self.prober
    }

    pub fn recovery(&self) -> RecoveryMode {
        self.recovery
    }

    async fn run(
        conn: &mut dyn SqlConnection,
        sql: &str,
        params: &[SqlValue],
        bind: bool,
    ) -> Result<QueryResult, BackendError> {
        if bind {
            conn.execute(sql, params).await
        } else {
            conn.query(sql).await
        }
    }

    async fn reconnect_and_run(
        endpoint: &Endpoint,
        sql: &str,
        params: &[SqlValue],
        bind: bool,
    ) -> Result<QueryResult, BackendError> {
        let mut conn = endpoint.backend().acquire().await?;
        Self::run(conn.as_mut(), sql, params, bind).await
    }

    async fn recover(
        &self,
        endpoint: &Endpoint,
        sql: &str,
        params: &[SqlValue],
    ) -> Option<QueryResult> {
        let attempt = match self.recovery {
            RecoveryMode::Disabled => return None,
            RecoveryMode::Rebind => Self::reconnect_and_run(endpoint, sql, params, true).await,
            RecoveryMode::Inline => {
                let literal = sql::inline_parameters(sql, params)?;
                warn!(
                    endpoint = %endpoint.backend().endpoint(),
                    "Retrying statement with parameters inlined into the SQL text"
                );
                Self::reconnect_and_run(endpoint, &literal, &[], false).await
            }
        };

        match attempt {
            Ok(result) => {
                debug!(recovery = %self.recovery, "Recovery attempt succeeded");
                Some(result)
            }
            Err(e) => {
                warn!(recovery = %self.recovery, error = %e, "Recovery attempt failed");
                None
            }
        }
    }
}

#[async_trait]
impl QueryExecutor for PooledExecutor {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> QueryResult {
        let params = if self.coerce_numeric_strings {
            coerce_numeric_strings(params)
        } else {
            params
        };

        if !self.endpoints.state().is_connected() {
            debug!("No connected endpoint, probing before statement");
            if !self.prober.probe().await {
                warn!("Database unavailable, returning neutral result");
                return QueryResult::neutral_for(sql);
            }
        }

        let placeholders = sql::placeholder_count(sql);
        if placeholders > 0 && !params.is_empty() && placeholders != params.len() {
            let err = BackendError::BindingMismatch {
                placeholders,
                params: params.len(),
            };
            warn!(error = %err, "Statement not sent");
            return QueryResult::neutral_for(sql);
        }

        let bind = placeholders > 0 && !params.is_empty();
        let endpoint = self.endpoints.resolve_active_endpoint();
        let start = Instant::now();

        let mut conn = match endpoint.backend().acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(
                    endpoint = %endpoint.role(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Could not acquire a connection, returning neutral result"
                );
                return QueryResult::neutral_for(sql);
            }
        };

        let outcome = Self::run(conn.as_mut(), sql, &params, bind).await;
        drop(conn);

        match outcome {
            Ok(result) => {
                debug!(
                    endpoint = %endpoint.role(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    rows = result.rows().len(),
                    affected_rows = result.mutation().affected_rows,
                    "Statement executed"
                );
                result
            }
            Err(e) => {
                warn!(
                    endpoint = %endpoint.role(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Statement failed"
                );
                if bind && let Some(result) = self.recover(endpoint, sql, &params).await {
                    return result;
                }
                QueryResult::neutral_for(sql)
            }
        }
    }

    fn connection_state(&self) -> ConnectionSnapshot {
        self.endpoints.snapshot()
    }

    async fn probe_now(&self) -> ConnectionSnapshot {
        self.prober.probe().await;
        self.endpoints.snapshot()
    }

    fn kind(&self) -> BackendKind {
        self.endpoints.kind()
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        let mut first_error = None;
        let mut initialised = 0usize;

        let endpoints = std::iter::once(self.endpoints.primary()).chain(self.endpoints.backup());
        for endpoint in endpoints {
            match endpoint.backend().init_schema().await {
                Ok(()) => {
                    debug!(endpoint = %endpoint.role(), "Schema ready");
                    initialised += 1;
                }
                Err(e) => {
                    warn!(endpoint = %endpoint.role(), error = %e, "Schema initialisation failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if initialised == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backends::sqlite::SqliteBackend;
    use crate::core::SqlBackend;
    use crate::failover::EndpointRole;

    async fn memory_executor() -> PooledExecutor {
        let backend: Arc<dyn SqlBackend> = Arc::new(SqliteBackend::in_memory().unwrap());
        backend.init_schema().await.unwrap();
        let endpoints = Arc::new(EndpointSet::new(backend, None));
        let prober = Arc::new(HealthProber::new(endpoints.clone(), Duration::from_secs(5)));
        PooledExecutor::new(endpoints, prober)
    }

    #[tokio::test]
    async fn test_first_statement_probes() {
        let executor = memory_executor().await;
        assert!(!executor.connection_state().probed);

        let result = executor.query("SELECT COUNT(*) AS n FROM users").await;
        assert_eq!(result.rows()[0]["n"], 0);

        let state = executor.connection_state();
        assert!(state.probed);
        assert!(state.connected);
        assert_eq!(state.active, EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_insert_and_select() {
        let executor = memory_executor().await;

        let inserted = executor
            .execute(
                "INSERT INTO users (name, phone) VALUES (?, ?)",
                vec!["Li".into(), "123".into()],
            )
            .await
            .mutation();
        assert_eq!(inserted.affected_rows, 1);
        assert!(inserted.insert_id > 0);

        let row = executor
            .execute(
                "SELECT name, phone FROM users WHERE id = ?",
                vec![inserted.insert_id.into()],
            )
            .await
            .first_row()
            .unwrap();
        assert_eq!(row["name"], "Li");
    }

    #[tokio::test]
    async fn test_binding_mismatch_is_neutral() {
        let executor = memory_executor().await;
        let result = executor
            .execute(
                "SELECT * FROM users WHERE id = ? AND phone = ?",
                vec![SqlValue::Integer(1)],
            )
            .await;
        assert_eq!(result, QueryResult::Rows(Vec::new()));
    }

    #[tokio::test]
    async fn test_failed_statement_is_neutral() {
        let executor = memory_executor()
            .await
            .with_recovery(RecoveryMode::Disabled);
        let result = executor
            .execute("DELETE FROM missing_table WHERE id = ?", vec![SqlValue::Integer(1)])
            .await;
        assert!(result.is_neutral());
        assert!(matches!(result, QueryResult::Mutation(_)));
    }

    #[tokio::test]
    async fn test_digit_strings_are_coerced() {
        let executor = memory_executor().await;
        let row = executor
            .execute("SELECT typeof(?) AS t", vec!["42".into()])
            .await
            .first_row()
            .unwrap();
        assert_eq!(row["t"], "integer");

        let executor = executor.with_coercion(false);
        let row = executor
            .execute("SELECT typeof(?) AS t", vec!["42".into()])
            .await
            .first_row()
            .unwrap();
        assert_eq!(row["t"], "text");
    }
}
