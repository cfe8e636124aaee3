//! SQLite backend integration tests.
//!
//! These tests exercise the SQLite backend and schema on disk, through both
//! raw connections and the pooled executor.

mod common;

use std::sync::Arc;

use hytt_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use hytt_persistence::core::{BackendKind, SqlBackend};
use hytt_persistence::error::BackendError;
use hytt_persistence::executor::{PooledExecutor, QueryExecutor};
use hytt_persistence::failover::EndpointSet;
use hytt_persistence::seed::{DEFAULT_NOTICES, seed_notices};
use hytt_persistence::types::{MutationResult, SqlValue};
use tempfile::TempDir;

use common::{prober_for, sqlite_endpoint};

async fn create_executor(dir: &TempDir) -> PooledExecutor {
    let backend = sqlite_endpoint(dir, "hytt.db").await;
    let endpoints = Arc::new(EndpointSet::new(backend, None));
    PooledExecutor::new(endpoints.clone(), prober_for(&endpoints))
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_schema_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hytt.db").to_string_lossy().to_string();

    {
        let backend = SqliteBackend::open(path.clone()).unwrap();
        backend.init_schema().await.unwrap();
        let mut conn = backend.acquire().await.unwrap();
        conn.execute(
            "INSERT INTO notices (title, content) VALUES (?, ?)",
            &[SqlValue::from("t"), SqlValue::from("c")],
        )
        .await
        .unwrap();
    }

    let backend = SqliteBackend::open(path).unwrap();
    backend.init_schema().await.unwrap();
    let mut conn = backend.acquire().await.unwrap();
    let rows = conn.query("SELECT title, status, is_important FROM notices").await.unwrap();
    assert_eq!(rows.rows().len(), 1);
    assert_eq!(rows.rows()[0]["status"], 1);
    assert_eq!(rows.rows()[0]["is_important"], 0);
}

#[tokio::test]
async fn test_status_defaults() {
    let dir = TempDir::new().unwrap();
    let executor = create_executor(&dir).await;

    executor
        .execute(
            "INSERT INTO bookings (user_id, vehicle_id, booking_time, service_type) VALUES (?, ?, ?, ?)",
            vec![
                SqlValue::Integer(1),
                SqlValue::Integer(2),
                "2024-05-01 09:00:00".into(),
                "wash".into(),
            ],
        )
        .await;
    executor
        .execute(
            "INSERT INTO vehicle_appointments (license_plate, name, phone, appointment_date, appointment_time) \
             VALUES (?, ?, ?, ?, ?)",
            vec![
                "京A12345".into(),
                "Li".into(),
                "13800000000".into(),
                "2024-05-01".into(),
                "09:00".into(),
            ],
        )
        .await;

    let booking = executor.query("SELECT status FROM bookings").await.first_row().unwrap();
    assert_eq!(booking["status"], "pending");

    let appointment = executor
        .query("SELECT status FROM vehicle_appointments")
        .await
        .first_row()
        .unwrap();
    assert_eq!(appointment["status"], "待审核");
}

// ============================================================================
// Statements
// ============================================================================

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() {
    let dir = TempDir::new().unwrap();
    let executor = create_executor(&dir).await;

    let created = executor
        .execute(
            "INSERT INTO vehicles (user_id, plate_number) VALUES (?, ?)",
            vec![SqlValue::Integer(1), "沪B00001".into()],
        )
        .await
        .mutation();
    assert!(created.insert_id > 0);

    let updated = executor
        .execute(
            "UPDATE vehicles SET brand = ? WHERE id = ?",
            vec!["BYD".into(), created.insert_id.into()],
        )
        .await
        .mutation();
    assert_eq!(updated, MutationResult::new(1, 0));

    let missing = executor
        .execute("DELETE FROM vehicles WHERE id = ?", vec![SqlValue::Integer(9999)])
        .await
        .mutation();
    assert!(!missing.changed());
}

#[tokio::test]
async fn test_null_and_real_columns() {
    let dir = TempDir::new().unwrap();
    let executor = create_executor(&dir).await;

    let row = executor
        .execute("SELECT ? AS nothing, ? AS ratio", vec![SqlValue::Null, SqlValue::Real(0.5)])
        .await
        .first_row()
        .unwrap();
    assert!(row["nothing"].is_null());
    assert_eq!(row["ratio"], 0.5);
}

#[tokio::test]
async fn test_seed_notices_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let executor = create_executor(&dir).await;

    let first = seed_notices(&executor).await;
    assert_eq!(first.inserted, DEFAULT_NOTICES.len());

    let second = seed_notices(&executor).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, DEFAULT_NOTICES.len());

    let count = executor
        .query("SELECT COUNT(*) AS n FROM notices WHERE is_important = 1")
        .await
        .first_row()
        .unwrap();
    assert_eq!(count["n"], 3);
}

// ============================================================================
// Pool
// ============================================================================

#[tokio::test]
async fn test_pool_stats_and_kind() {
    let dir = TempDir::new().unwrap();
    let config = SqliteBackendConfig {
        max_connections: 3,
        ..Default::default()
    };
    let backend =
        SqliteBackend::with_config(dir.path().join("p.db").to_string_lossy(), config).unwrap();

    assert_eq!(backend.kind(), BackendKind::Sqlite);
    assert!(backend.endpoint().starts_with("sqlite://"));
    backend.ping().await.unwrap();
    assert_eq!(backend.pool_stats().max_size, 3);
}

#[tokio::test]
async fn test_unopenable_path_is_connection_error() {
    let config = SqliteBackendConfig {
        connection_timeout_ms: 100,
        ..Default::default()
    };
    let backend = SqliteBackend::with_config("/nonexistent-dir/hytt/x.db", config).unwrap();
    let err = backend.ping().await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(matches!(err, BackendError::ConnectionFailed { .. }));
}
