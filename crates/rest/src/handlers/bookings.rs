//! Booking handlers.
//!
//! `[base]/api/bookings`
//!
//! Listings join the owning user's name and the vehicle's plate number.
//! A booking starts `pending` and moves between the states in
//! [`BOOKING_STATUSES`].

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use hytt_persistence::types::Row;
use serde_json::Value;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Fields, id_param};
use crate::responses::{created, message, now_string, require_changed};
use crate::state::AppState;

const NOT_FOUND: &str = "预约不存在";

/// Accepted values of a booking's `status`.
pub const BOOKING_STATUSES: [&str; 4] = ["pending", "confirmed", "completed", "cancelled"];

const JOINED_SELECT: &str = "SELECT b.*, u.name AS user_name, v.plate_number \
     FROM bookings b \
     LEFT JOIN users u ON b.user_id = u.id \
     LEFT JOIN vehicles v ON b.vehicle_id = v.id";

/// `GET /api/bookings`
pub async fn list_bookings_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    Json(state.executor().query(JOINED_SELECT).await.into_rows())
}

/// `GET /api/bookings/{id}`
pub async fn get_booking_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute(&format!("{} WHERE b.id = ?", JOINED_SELECT), vec![id_param(&id)])
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `GET /api/bookings/user/{userId}`, newest first.
pub async fn list_user_bookings_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Row>> {
    Json(
        state
            .executor()
            .execute(
                "SELECT b.*, v.plate_number FROM bookings b \
                 LEFT JOIN vehicles v ON b.vehicle_id = v.id \
                 WHERE b.user_id = ? ORDER BY b.booking_time DESC",
                vec![id_param(&user_id)],
            )
            .await
            .into_rows(),
    )
}

/// `GET /api/bookings/date/{date}`: bookings on one `YYYY-MM-DD` day.
pub async fn list_bookings_by_date_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Json<Vec<Row>> {
    Json(
        state
            .executor()
            .execute(
                &format!(
                    "{} WHERE substr(b.booking_time, 1, 10) = ? ORDER BY b.booking_time",
                    JOINED_SELECT
                ),
                vec![date.into()],
            )
            .await
            .into_rows(),
    )
}

/// `POST /api/bookings`
///
/// Requires `user_id`, `vehicle_id`, `booking_time` and `service_type`.
/// `notes` is optional.
pub async fn create_booking_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(
        &["user_id", "vehicle_id", "booking_time", "service_type"],
        "用户ID、车辆ID、预约时间和服务类型不能为空",
    )?;

    let result = state
        .executor()
        .execute(
            "INSERT INTO bookings \
             (user_id, vehicle_id, booking_time, service_type, status, notes, create_time) \
             VALUES (?, ?, ?, ?, 'pending', ?, ?)",
            vec![
                fields.value("user_id"),
                fields.value("vehicle_id"),
                fields.value("booking_time"),
                fields.value("service_type"),
                fields.value("notes"),
                now_string().into(),
            ],
        )
        .await
        .mutation();

    debug!(booking_id = result.insert_id, "Booking created");
    Ok(created("预约创建成功", "bookingId", result))
}

/// `PUT /api/bookings/{id}/status`
///
/// - `400 Bad Request` - `status` missing or not one of [`BOOKING_STATUSES`]
/// - `404 Not Found` - no such booking
pub async fn update_booking_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    fields.require(&["status"], "状态不能为空")?;
    let status = fields
        .text("status")
        .filter(|s| BOOKING_STATUSES.contains(s))
        .ok_or_else(|| {
            RestError::bad_request("无效的状态值，必须是 pending, confirmed, completed 或 cancelled")
        })?;

    let result = state
        .executor()
        .execute(
            "UPDATE bookings SET status = ?, update_time = ? WHERE id = ?",
            vec![status.into(), now_string().into(), id_param(&id)],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    debug!(id = %id, status, "Booking status changed");
    Ok(message("预约状态更新成功"))
}

/// `PUT /api/bookings/{id}`: replaces time, service type and notes.
pub async fn update_booking_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute(
            "UPDATE bookings SET booking_time = ?, service_type = ?, notes = ?, update_time = ? \
             WHERE id = ?",
            vec![
                fields.value("booking_time"),
                fields.value("service_type"),
                fields.value("notes"),
                now_string().into(),
                id_param(&id),
            ],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("预约更新成功"))
}

/// `DELETE /api/bookings/{id}`
pub async fn delete_booking_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute("DELETE FROM bookings WHERE id = ?", vec![id_param(&id)])
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("预约删除成功"))
}
