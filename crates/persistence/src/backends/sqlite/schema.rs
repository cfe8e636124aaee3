//! SQLite schema definitions.

use rusqlite::Connection;

use crate::error::{BackendError, BackendResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> BackendResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> BackendResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| schema_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> BackendResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| schema_error(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| schema_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

fn create_schema_v1(conn: &Connection) -> BackendResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            openid TEXT,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_users_openid ON users(openid);

        CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            plate_number TEXT NOT NULL,
            vehicle_type TEXT,
            brand TEXT,
            model TEXT,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_vehicles_user ON vehicles(user_id);
        CREATE INDEX IF NOT EXISTS idx_vehicles_plate ON vehicles(plate_number);

        CREATE TABLE IF NOT EXISTS bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            vehicle_id INTEGER NOT NULL,
            booking_time TEXT NOT NULL,
            service_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            notes TEXT,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_time ON bookings(booking_time);

        CREATE TABLE IF NOT EXISTS vehicle_appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            license_plate TEXT NOT NULL,
            vehicle_type TEXT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            appointment_date TEXT NOT NULL,
            appointment_time TEXT NOT NULL,
            purpose TEXT,
            status TEXT NOT NULL DEFAULT '待审核',
            user_id INTEGER,
            created_by INTEGER,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_phone ON vehicle_appointments(phone);
        CREATE INDEX IF NOT EXISTS idx_appointments_plate ON vehicle_appointments(license_plate);
        CREATE INDEX IF NOT EXISTS idx_appointments_date ON vehicle_appointments(appointment_date);

        CREATE TABLE IF NOT EXISTS banners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT,
            image_url TEXT NOT NULL,
            link_url TEXT,
            sort_order INTEGER DEFAULT 0,
            status INTEGER DEFAULT 1,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );

        CREATE TABLE IF NOT EXISTS notices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT,
            publish_time TEXT,
            end_time TEXT,
            is_important INTEGER DEFAULT 0,
            status INTEGER DEFAULT 1,
            create_time TEXT DEFAULT CURRENT_TIMESTAMP,
            update_time TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_notices_listing ON notices(status, is_important, publish_time);
        ",
    )
    .map_err(|e| schema_error(format!("Failed to create tables: {}", e)))
}

fn schema_error(message: String) -> BackendError {
    BackendError::SchemaError { message }
}
