//! SQLite backend implementation.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EndpointConfig;
use crate::core::{BackendKind, PoolStats, SqlBackend, SqlConnection};
use crate::error::{BackendError, BackendResult};
use crate::types::{MutationResult, QueryResult, Row, SqlValue};

use super::schema;

const BACKEND_NAME: &str = "sqlite";

/// SQLite backend for one endpoint.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    path: String,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    10_000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteBackendConfig {
    /// Pool settings for an endpoint.
    pub fn for_endpoint(endpoint: &EndpointConfig) -> Self {
        Self {
            max_connections: endpoint.pool_size.max(1),
            connection_timeout_ms: (endpoint.connect_timeout.as_millis() as u64).max(1),
            ..Default::default()
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    ///
    /// The pool holds a single connection so every statement sees the same
    /// database.
    pub fn in_memory() -> BackendResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open(path: impl Into<String>) -> BackendResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend for an endpoint.
    pub fn from_endpoint(endpoint: &EndpointConfig) -> BackendResult<Self> {
        Self::with_config(
            endpoint.path.clone(),
            SqliteBackendConfig::for_endpoint(endpoint),
        )
    }

    /// Creates a backend with custom configuration.
    ///
    /// No connection is opened here; an unusable path surfaces on the first
    /// acquisition.
    pub fn with_config(path: impl Into<String>, config: SqliteBackendConfig) -> BackendResult<Self> {
        let path = path.into();
        let is_memory = path == ":memory:";

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
        let foreign_keys = config.enable_foreign_keys;
        let wal = config.enable_wal && !is_memory;

        let manager = SqliteConnectionManager::file(&path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON")?;
            }
            if wal {
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            }
            Ok(())
        });

        let max_size = if is_memory { 1 } else { config.max_connections.max(1) };
        let mut builder = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms.max(1)));
        if is_memory {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder.build_unchecked(manager);

        Ok(Self {
            pool,
            config,
            path,
            is_memory,
        })
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }

    /// Get a connection from the pool on the blocking thread pool.
    async fn get_connection(&self) -> BackendResult<PooledConnection<SqliteConnectionManager>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| task_failed("connection", e))?
            .map_err(|e| BackendError::connection(BACKEND_NAME, e))
    }
}

fn task_failed(what: &str, e: tokio::task::JoinError) -> BackendError {
    BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message: format!("{} task failed: {}", what, e),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl SqlBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn endpoint(&self) -> String {
        format!("sqlite://{}", self.path)
    }

    fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            max_size: self.pool.max_size(),
            size: state.connections,
            idle: state.idle_connections,
        }
    }

    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, BackendError> {
        let conn = self.get_connection().await?;
        Ok(Box::new(SqlitePooledConnection(Some(conn))))
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        let conn = self.get_connection().await?;
        schema::initialize_schema(&conn)
    }
}

/// Connection wrapper for SQLite. Returned to the pool on drop.
///
/// Statements run on the blocking thread pool. The connection moves into the
/// blocking task and comes back with the result; a cancelled statement
/// returns it to the pool when the task finishes.
pub struct SqlitePooledConnection(Option<PooledConnection<SqliteConnectionManager>>);

impl Debug for SqlitePooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePooledConnection")
            .field("held", &self.0.is_some())
            .finish()
    }
}

impl SqlitePooledConnection {
    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> BackendResult<QueryResult> {
        let conn = self.0.take().ok_or_else(|| BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: "connection was lost by an interrupted statement".to_string(),
            source: None,
        })?;
        let sql = sql.to_string();
        let params = params.to_vec();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = run_statement(&conn, &sql, &params);
            (conn, result)
        })
        .await
        .map_err(|e| task_failed("statement", e))?;

        self.0 = Some(conn);
        result.map_err(|e| BackendError::query(BACKEND_NAME, e))
    }
}

#[async_trait]
impl SqlConnection for SqlitePooledConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        self.run(sql, params).await
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult, BackendError> {
        self.run(sql, &[]).await
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Runs one statement. Statements that yield columns return rows; the rest
/// report changes and, for inserts, the new row id.
fn run_statement(conn: &Connection, sql: &str, params: &[SqlValue]) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() > 0 {
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), column_to_json(row.get_ref(i)?));
            }
            out.push(map);
        }
        return Ok(QueryResult::Rows(out));
    }

    let affected = stmt.execute(params_from_iter(params.iter()))?;
    let insert_id = if is_insert(sql) {
        conn.last_insert_rowid()
    } else {
        0
    };
    Ok(QueryResult::Mutation(MutationResult::new(
        affected as u64,
        insert_id,
    )))
}

fn is_insert(sql: &str) -> bool {
    let trimmed = sql.trim_start().as_bytes();
    trimmed.len() >= 6 && trimmed[..6].eq_ignore_ascii_case(b"insert")
}

/// Maps a column by storage class.
fn column_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().await.unwrap();

        let mut conn = backend.acquire().await.unwrap();
        let inserted = conn
            .execute(
                "INSERT INTO users (name, phone) VALUES (?, ?)",
                &[SqlValue::from("Li"), SqlValue::from("123")],
            )
            .await
            .unwrap();
        assert_eq!(inserted.mutation(), MutationResult::new(1, 1));

        let rows = conn
            .execute("SELECT id, name, phone FROM users WHERE id = ?", &[SqlValue::Integer(1)])
            .await
            .unwrap();
        assert_eq!(rows.rows().len(), 1);
        assert_eq!(rows.rows()[0]["name"], json!("Li"));
        assert_eq!(rows.rows()[0]["id"], json!(1));
    }

    #[tokio::test]
    async fn test_update_reports_no_insert_id() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().await.unwrap();
        let mut conn = backend.acquire().await.unwrap();
        conn.query("INSERT INTO users (name, phone) VALUES ('a', '1')")
            .await
            .unwrap();

        let updated = conn
            .execute(
                "UPDATE users SET name = ? WHERE id = ?",
                &[SqlValue::from("b"), SqlValue::Integer(1)],
            )
            .await
            .unwrap();
        assert_eq!(updated.mutation(), MutationResult::new(1, 0));
    }

    #[tokio::test]
    async fn test_ping_and_stats() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.ping().await.unwrap();
        let stats = backend.pool_stats();
        assert_eq!(stats.max_size, 1);
        assert_eq!(backend.endpoint(), "sqlite://:memory:");
    }

    #[tokio::test]
    async fn test_unreachable_path_fails_on_acquire() {
        let config = SqliteBackendConfig {
            connection_timeout_ms: 100,
            ..Default::default()
        };
        let backend =
            SqliteBackend::with_config("/nonexistent-dir/hytt/primary.db", config).unwrap();
        let err = backend.ping().await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_locked_write_does_not_stall_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = SqliteBackend::open(dir.path().join("hytt.db").to_string_lossy()).unwrap();
        backend.init_schema().await.unwrap();

        let mut holder = backend.acquire().await.unwrap();
        holder.query("BEGIN IMMEDIATE").await.unwrap();

        let mut writer = backend.acquire().await.unwrap();
        {
            let mut insert = writer.query("INSERT INTO users (name, phone) VALUES ('w', '2')");
            let timer_won = tokio::select! {
                biased;
                _ = &mut insert => false,
                _ = tokio::time::sleep(Duration::from_millis(50)) => true,
            };
            assert!(timer_won, "waiting writer blocked the runtime thread");

            holder.query("COMMIT").await.unwrap();
            let inserted = insert.await.unwrap();
            assert_eq!(inserted.mutation().affected_rows, 1);
        }

        let rows = writer.query("SELECT COUNT(*) AS n FROM users").await.unwrap();
        assert_eq!(rows.rows()[0]["n"], json!(1));
    }

    #[tokio::test]
    async fn test_syntax_error_is_query_error() {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut conn = backend.acquire().await.unwrap();
        let err = conn.query("SELEC 1").await.unwrap_err();
        assert!(matches!(err, BackendError::QueryError { .. }));
    }
}
