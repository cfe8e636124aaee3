//! User handlers.
//!
//! `[base]/api/users`

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use hytt_persistence::types::Row;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Fields, id_param};
use crate::responses::{created, message, now_string, require_changed};
use crate::state::AppState;

const NOT_FOUND: &str = "用户不存在";

/// `GET /api/users`
pub async fn list_users_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    debug!("Listing users");
    Json(state.executor().query("SELECT * FROM users").await.into_rows())
}

/// `GET /api/users/{id}`
///
/// - `200 OK` - the user row
/// - `404 Not Found` - no such user
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Row>> {
    debug!(id = %id, "Reading user");
    state
        .executor()
        .execute("SELECT * FROM users WHERE id = ?", vec![id_param(&id)])
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `GET /api/users/openid/{openid}`
pub async fn get_user_by_openid_handler(
    State(state): State<AppState>,
    Path(openid): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute("SELECT * FROM users WHERE openid = ?", vec![openid.into()])
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `POST /api/users`
///
/// Requires `name` and `phone`; `openid` is optional.
///
/// - `201 Created` - `{"message": "用户创建成功", "userId": ...}`
/// - `400 Bad Request` - a required field is missing
pub async fn create_user_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(&["name", "phone"], "姓名和电话不能为空")?;

    let result = state
        .executor()
        .execute(
            "INSERT INTO users (name, phone, openid, create_time) VALUES (?, ?, ?, ?)",
            vec![
                fields.value("name"),
                fields.value("phone"),
                fields.value("openid"),
                now_string().into(),
            ],
        )
        .await
        .mutation();

    debug!(user_id = result.insert_id, "User created");
    Ok(created("用户创建成功", "userId", result))
}

/// `PUT /api/users/{id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<serde_json::Value>> {
    let result = state
        .executor()
        .execute(
            "UPDATE users SET name = ?, phone = ?, update_time = ? WHERE id = ?",
            vec![
                fields.value("name"),
                fields.value("phone"),
                now_string().into(),
                id_param(&id),
            ],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("用户更新成功"))
}

/// `DELETE /api/users/{id}`
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<serde_json::Value>> {
    let result = state
        .executor()
        .execute("DELETE FROM users WHERE id = ?", vec![id_param(&id)])
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("用户删除成功"))
}
