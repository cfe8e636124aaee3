//! PostgreSQL schema definitions.
//!
//! Integer columns are `BIGINT` so they bind directly to `i64`. Times are
//! `TEXT` in `YYYY-MM-DD HH:MM:SS` form, matching the SQLite schema.

use crate::error::{BackendError, BackendResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub async fn initialize_schema(client: &deadpool_postgres::Client) -> BackendResult<()> {
    let current_version = get_schema_version(client).await?;

    if current_version < SCHEMA_VERSION {
        create_schema_v1(client).await?;
        set_schema_version(client, SCHEMA_VERSION).await?;
    }

    Ok(())
}

/// Get the current schema version.
async fn get_schema_version(client: &deadpool_postgres::Client) -> BackendResult<i32> {
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            )",
            &[],
        )
        .await
        .map_err(|e| pg_error(format!("Failed to create schema_version table: {}", e)))?;

    let row = client
        .query_opt("SELECT version FROM schema_version LIMIT 1", &[])
        .await
        .map_err(|e| pg_error(format!("Failed to query schema version: {}", e)))?;

    Ok(row.map(|r| r.get::<_, i32>(0)).unwrap_or(0))
}

/// Set the schema version.
async fn set_schema_version(client: &deadpool_postgres::Client, version: i32) -> BackendResult<()> {
    client
        .execute("DELETE FROM schema_version", &[])
        .await
        .map_err(|e| pg_error(format!("Failed to clear schema_version: {}", e)))?;

    client
        .execute(
            "INSERT INTO schema_version (version) VALUES ($1)",
            &[&version],
        )
        .await
        .map_err(|e| pg_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

async fn create_schema_v1(client: &deadpool_postgres::Client) -> BackendResult<()> {
    client
        .batch_execute(
            "
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                openid TEXT,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_users_openid ON users(openid);

            CREATE TABLE IF NOT EXISTS vehicles (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                plate_number TEXT NOT NULL,
                vehicle_type TEXT,
                brand TEXT,
                model TEXT,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_vehicles_user ON vehicles(user_id);
            CREATE INDEX IF NOT EXISTS idx_vehicles_plate ON vehicles(plate_number);

            CREATE TABLE IF NOT EXISTS bookings (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                vehicle_id BIGINT NOT NULL,
                booking_time TEXT NOT NULL,
                service_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                notes TEXT,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_time ON bookings(booking_time);

            CREATE TABLE IF NOT EXISTS vehicle_appointments (
                id BIGSERIAL PRIMARY KEY,
                license_plate TEXT NOT NULL,
                vehicle_type TEXT,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                appointment_date TEXT NOT NULL,
                appointment_time TEXT NOT NULL,
                purpose TEXT,
                status TEXT NOT NULL DEFAULT '待审核',
                user_id BIGINT,
                created_by BIGINT,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_appointments_phone ON vehicle_appointments(phone);
            CREATE INDEX IF NOT EXISTS idx_appointments_plate ON vehicle_appointments(license_plate);
            CREATE INDEX IF NOT EXISTS idx_appointments_date ON vehicle_appointments(appointment_date);

            CREATE TABLE IF NOT EXISTS banners (
                id BIGSERIAL PRIMARY KEY,
                title TEXT,
                image_url TEXT NOT NULL,
                link_url TEXT,
                sort_order BIGINT DEFAULT 0,
                status BIGINT DEFAULT 1,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );

            CREATE TABLE IF NOT EXISTS notices (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT,
                publish_time TEXT,
                end_time TEXT,
                is_important BIGINT DEFAULT 0,
                status BIGINT DEFAULT 1,
                create_time TEXT DEFAULT to_char(now(), 'YYYY-MM-DD HH24:MI:SS'),
                update_time TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_notices_listing ON notices(status, is_important, publish_time);
            ",
        )
        .await
        .map_err(|e| pg_error(format!("Failed to create tables: {}", e)))
}

fn pg_error(message: String) -> BackendError {
    BackendError::SchemaError { message }
}
