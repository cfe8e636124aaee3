//! Response shaping shared by the handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Local;
use hytt_persistence::types::MutationResult;
use serde_json::{Value, json};

use crate::error::{RestError, RestResult};

/// Current local time in the stored `YYYY-MM-DD HH:MM:SS` form.
pub fn now_string() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today_string() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// `{"message": message}`.
pub fn message(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

/// `201 Created` with `{"message": message, <id_key>: insertId}`.
///
/// A mutation that did not reach the database reports id 0.
pub fn created(message: &str, id_key: &str, result: MutationResult) -> Response {
    let mut body = serde_json::Map::new();
    body.insert("message".to_string(), Value::from(message));
    body.insert(id_key.to_string(), Value::from(result.insert_id));
    (StatusCode::CREATED, Json(Value::Object(body))).into_response()
}

/// Maps a mutation that touched no rows to a 404 with `not_found`.
pub fn require_changed(result: MutationResult, not_found: &str) -> RestResult<()> {
    if result.changed() {
        Ok(())
    } else {
        Err(RestError::not_found(not_found))
    }
}
