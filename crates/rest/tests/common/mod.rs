//! Test harness for the REST API.
//!
//! - [`TestApp::sqlite`] - an app over a fresh on-disk SQLite database
//! - [`TestApp::offline`] - an app whose database can never be reached

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use hytt_persistence::config::DatabaseConfig;
use hytt_persistence::executor::{OfflineExecutor, PooledExecutor, QueryExecutor};
use hytt_persistence::types::SqlValue;
use hytt_rest::{AppState, ServerConfig, create_app_with_state};

/// A running test server plus the pieces a test may want to poke directly.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub executor: Arc<dyn QueryExecutor>,
    _dir: Option<TempDir>,
}

impl TestApp {
    /// An app over a new SQLite file with the application schema.
    pub async fn sqlite() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("hytt.db").to_string_lossy().to_string();

        let executor = PooledExecutor::from_config(&DatabaseConfig::sqlite(path))
            .expect("Failed to build executor");
        executor.init_schema().await.expect("Failed to init schema");

        Self::build(Arc::new(executor), Some(dir))
    }

    /// An app over a SQLite file in a directory that does not exist.
    pub async fn unreachable() -> Self {
        let config = DatabaseConfig::sqlite("/nonexistent-dir/hytt/unreachable.db")
            .with_connect_timeout_secs(1);
        let executor = PooledExecutor::from_config(&config).expect("Failed to build executor");
        Self::build(Arc::new(executor), None)
    }

    /// An app that was started without any database.
    pub fn offline() -> Self {
        Self::build(
            Arc::new(OfflineExecutor::with_reason("test without database")),
            None,
        )
    }

    /// An app over an executor the test built itself.
    pub fn with_executor(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::build(executor, None)
    }

    fn build(executor: Arc<dyn QueryExecutor>, dir: Option<TempDir>) -> Self {
        let state = AppState::new(Arc::clone(&executor), ServerConfig::for_testing());
        let server =
            TestServer::new(create_app_with_state(state.clone())).expect("Failed to create test server");
        Self {
            server,
            state,
            executor,
            _dir: dir,
        }
    }

    /// Runs a statement directly against the database.
    pub async fn exec(&self, sql: &str, params: Vec<SqlValue>) {
        self.executor.execute(sql, params).await;
    }

    /// Creates a user through the API and returns its id.
    pub async fn create_user(&self, name: &str, phone: &str) -> i64 {
        let response = self
            .server
            .post("/api/users")
            .json(&serde_json::json!({ "name": name, "phone": phone }))
            .await;
        id_from(&response.json::<Value>(), "userId")
    }

    /// Creates a vehicle through the API and returns its id.
    pub async fn create_vehicle(&self, user_id: i64, plate: &str) -> i64 {
        let response = self
            .server
            .post("/api/vehicles")
            .json(&serde_json::json!({ "user_id": user_id, "plate_number": plate }))
            .await;
        id_from(&response.json::<Value>(), "vehicleId")
    }
}

pub fn id_from(body: &Value, key: &str) -> i64 {
    body[key]
        .as_i64()
        .unwrap_or_else(|| panic!("missing {} in {}", key, body))
}
