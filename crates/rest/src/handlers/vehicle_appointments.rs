//! Vehicle appointment handlers.
//!
//! `[base]/api/vehicle-appointments`
//!
//! Appointments are made by visitors by plate and phone number and start
//! in the `待审核` (awaiting review) state.

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use hytt_persistence::types::{Row, SqlValue};
use serde_json::Value;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Fields, id_param};
use crate::responses::{created, message, now_string, require_changed};
use crate::state::AppState;

const NOT_FOUND: &str = "预约不存在";

const REQUIRED: [&str; 5] = [
    "license_plate",
    "name",
    "phone",
    "appointment_date",
    "appointment_time",
];

const REQUIRED_MESSAGE: &str = "车牌号、姓名、电话、预约日期和时间不能为空";

/// Accepted values of an appointment's `status`.
pub const APPOINTMENT_STATUSES: [&str; 5] = ["待审核", "已确认", "已完成", "已取消", "已拒绝"];

async fn select(state: &AppState, sql: &str, params: Vec<SqlValue>) -> Json<Vec<Row>> {
    Json(state.executor().execute(sql, params).await.into_rows())
}

/// `GET /api/vehicle-appointments`, in schedule order.
pub async fn list_appointments_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    select(
        &state,
        "SELECT * FROM vehicle_appointments ORDER BY appointment_date, appointment_time",
        Vec::new(),
    )
    .await
}

/// `GET /api/vehicle-appointments/{id}`
pub async fn get_appointment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute(
            "SELECT * FROM vehicle_appointments WHERE id = ?",
            vec![id_param(&id)],
        )
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `GET /api/vehicle-appointments/phone/{phone}`, newest first.
pub async fn list_appointments_by_phone_handler(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Json<Vec<Row>> {
    select(
        &state,
        "SELECT * FROM vehicle_appointments WHERE phone = ? \
         ORDER BY appointment_date DESC, appointment_time DESC",
        vec![phone.into()],
    )
    .await
}

/// `GET /api/vehicle-appointments/license/{licensePlate}`, newest first.
pub async fn list_appointments_by_license_handler(
    State(state): State<AppState>,
    Path(license_plate): Path<String>,
) -> Json<Vec<Row>> {
    select(
        &state,
        "SELECT * FROM vehicle_appointments WHERE license_plate = ? \
         ORDER BY appointment_date DESC, appointment_time DESC",
        vec![license_plate.into()],
    )
    .await
}

/// `GET /api/vehicle-appointments/date/{date}`
pub async fn list_appointments_by_date_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Json<Vec<Row>> {
    select(
        &state,
        "SELECT * FROM vehicle_appointments WHERE appointment_date = ? ORDER BY appointment_time",
        vec![date.into()],
    )
    .await
}

/// `GET /api/vehicle-appointments/user/{userId}`: appointments owned or
/// created by the user, newest first.
pub async fn list_user_appointments_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Row>> {
    select(
        &state,
        "SELECT * FROM vehicle_appointments WHERE user_id = ? OR created_by = ? \
         ORDER BY appointment_date DESC, appointment_time DESC",
        vec![id_param(&user_id), id_param(&user_id)],
    )
    .await
}

fn appointment_params(fields: &Fields) -> Vec<SqlValue> {
    [
        "license_plate",
        "vehicle_type",
        "name",
        "phone",
        "appointment_date",
        "appointment_time",
        "purpose",
    ]
    .iter()
    .map(|key| fields.value(key))
    .collect()
}

/// `POST /api/vehicle-appointments`
///
/// `user_id` and `created_by` are optional and link the appointment to a
/// registered user.
pub async fn create_appointment_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(&REQUIRED, REQUIRED_MESSAGE)?;

    let mut params = appointment_params(&fields);
    params.push(fields.value("user_id"));
    params.push(fields.value("created_by"));
    params.push(now_string().into());

    let result = state
        .executor()
        .execute(
            "INSERT INTO vehicle_appointments \
             (license_plate, vehicle_type, name, phone, appointment_date, appointment_time, \
             purpose, user_id, created_by, status, create_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '待审核', ?)",
            params,
        )
        .await
        .mutation();

    debug!(appointment_id = result.insert_id, "Vehicle appointment created");
    Ok(created("预约创建成功", "appointmentId", result))
}

/// `PUT /api/vehicle-appointments/{id}/status`
pub async fn update_appointment_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    fields.require(&["status"], "状态不能为空")?;
    let status = fields
        .text("status")
        .filter(|s| APPOINTMENT_STATUSES.contains(s))
        .ok_or_else(|| {
            RestError::bad_request("无效的状态值，必须是待审核、已确认、已完成、已取消或已拒绝")
        })?;

    let result = state
        .executor()
        .execute(
            "UPDATE vehicle_appointments SET status = ?, update_time = ? WHERE id = ?",
            vec![status.into(), now_string().into(), id_param(&id)],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("预约状态更新成功"))
}

/// `PUT /api/vehicle-appointments/{id}`
pub async fn update_appointment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    fields.require(&REQUIRED, REQUIRED_MESSAGE)?;

    let mut params = appointment_params(&fields);
    params.push(now_string().into());
    params.push(id_param(&id));

    let result = state
        .executor()
        .execute(
            "UPDATE vehicle_appointments \
             SET license_plate = ?, vehicle_type = ?, name = ?, phone = ?, \
             appointment_date = ?, appointment_time = ?, purpose = ?, update_time = ? \
             WHERE id = ?",
            params,
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("预约信息更新成功"))
}

/// `DELETE /api/vehicle-appointments/{id}`
pub async fn delete_appointment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute(
            "DELETE FROM vehicle_appointments WHERE id = ?",
            vec![id_param(&id)],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("预约删除成功"))
}
