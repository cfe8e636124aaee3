//! Test infrastructure for the persistence layer.
//!
//! - [`ScriptedBackend`] - an in-process backend whose availability and
//!   statement failures are controlled by the test
//! - [`sqlite_endpoint`] / [`unreachable_sqlite`] - on-disk SQLite endpoints

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;

use hytt_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use hytt_persistence::core::{BackendKind, PoolStats, SqlBackend, SqlConnection};
use hytt_persistence::error::BackendError;
use hytt_persistence::failover::{EndpointSet, HealthProber};
use hytt_persistence::types::{MutationResult, QueryResult, Row, SqlValue, StatementKind};

/// One statement as seen by a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub bound: bool,
}

#[derive(Debug)]
struct Script {
    up: AtomicBool,
    fail_next: AtomicUsize,
    attempts: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    statements: Mutex<Vec<Recorded>>,
}

/// Backend that answers every select with one row `{"ok": 1}` and every
/// mutation with `{affectedRows: 1, insertId: 7}`.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub fn up() -> Self {
        Self {
            script: Arc::new(Script {
                up: AtomicBool::new(true),
                fail_next: AtomicUsize::new(0),
                attempts: AtomicUsize::new(0),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                statements: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn down() -> Self {
        let backend = Self::up();
        backend.set_up(false);
        backend
    }

    pub fn set_up(&self, up: bool) {
        self.script.up.store(up, Ordering::SeqCst);
    }

    /// The next `n` statements fail with a query error.
    pub fn fail_next(&self, n: usize) {
        self.script.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.script.statements.lock().clone()
    }

    /// Statements other than the `SELECT 1` pings.
    pub fn work(&self) -> Vec<Recorded> {
        self.statements()
            .into_iter()
            .filter(|r| r.sql != "SELECT 1")
            .collect()
    }

    /// Every call to `acquire`, including the ones refused while down.
    pub fn attempts(&self) -> usize {
        self.script.attempts.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.script.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.script.released.load(Ordering::SeqCst)
    }

    pub fn arc(&self) -> Arc<dyn SqlBackend> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SqlBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn endpoint(&self) -> String {
        "scripted://test".to_string()
    }

    fn pool_stats(&self) -> PoolStats {
        PoolStats::default()
    }

    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, BackendError> {
        self.script.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.script.up.load(Ordering::SeqCst) {
            return Err(BackendError::connection("scripted", "endpoint is down"));
        }
        self.script.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
        }))
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

struct ScriptedConnection {
    script: Arc<Script>,
}

impl ScriptedConnection {
    fn run(&self, sql: &str, params: &[SqlValue], bound: bool) -> Result<QueryResult, BackendError> {
        self.script.statements.lock().push(Recorded {
            sql: sql.to_string(),
            params: params.to_vec(),
            bound,
        });

        let failing = self
            .script
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::query("scripted", "scripted failure"));
        }

        Ok(match StatementKind::classify(sql) {
            StatementKind::Select => {
                let mut row = Row::new();
                row.insert("ok".to_string(), json!(1));
                QueryResult::Rows(vec![row])
            }
            StatementKind::Mutation => QueryResult::Mutation(MutationResult::new(1, 7)),
        })
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.script.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SqlConnection for ScriptedConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        self.run(sql, params, true)
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult, BackendError> {
        self.run(sql, &[], false)
    }
}

/// A file-backed SQLite endpoint with the application schema.
pub async fn sqlite_endpoint(dir: &TempDir, name: &str) -> Arc<dyn SqlBackend> {
    let path = dir.path().join(name);
    let backend = SqliteBackend::open(path.to_string_lossy().to_string())
        .expect("Failed to create SQLite backend");
    backend.init_schema().await.expect("Failed to initialize schema");
    Arc::new(backend)
}

/// A SQLite endpoint whose directory does not exist.
pub fn unreachable_sqlite() -> Arc<dyn SqlBackend> {
    let config = SqliteBackendConfig {
        connection_timeout_ms: 100,
        ..Default::default()
    };
    Arc::new(
        SqliteBackend::with_config("/nonexistent-dir/hytt/unreachable.db", config)
            .expect("Failed to create SQLite backend"),
    )
}

pub fn prober_for(endpoints: &Arc<EndpointSet>) -> Arc<HealthProber> {
    Arc::new(HealthProber::new(endpoints.clone(), Duration::from_secs(5)))
}
