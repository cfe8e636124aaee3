//! Vehicle handlers.
//!
//! `[base]/api/vehicles`

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

const NOT_FOUND: &str = "车辆不存在";

/// `GET /api/vehicles`
pub async fn list_vehicles_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    Json(state.executor().query("SELECT * FROM vehicles").await.into_rows())
}

/// `GET /api/vehicles/{id}`
pub async fn get_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute("SELECT * FROM vehicles WHERE id = ?", vec![id_param(&id)])
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `GET /api/vehicles/user/{userId}`
pub async fn list_user_vehicles_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Row>> {
    Json(
        state
            .executor()
            .execute("SELECT * FROM vehicles WHERE user_id = ?", vec![id_param(&user_id)])
            .await
            .into_rows(),
    )
}

/// `GET /api/vehicles/plate/{plateNumber}`
pub async fn get_vehicle_by_plate_handler(
    State(state): State<AppState>,
    Path(plate_number): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute(
            "SELECT * FROM vehicles WHERE plate_number = ?",
            vec![plate_number.into()],
        )
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `POST /api/vehicles`
///
/// Requires `user_id` and `plate_number`; `vehicle_type`, `brand` and
/// `model` are optional.
pub async fn create_vehicle_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(&["user_id", "plate_number"], "用户ID和车牌号不能为空")?;

    let result = state
        .executor()
        .execute(
            "INSERT INTO vehicles (user_id, plate_number, vehicle_type, brand, model, create_time) \
             VALUES (?, ?, ?, ?, ?, ?)",
            vec![
                fields.value("user_id"),
                fields.value("plate_number"),
                fields.value("vehicle_type"),
                fields.value("brand"),
                fields.value("model"),
                now_string().into(),
            ],
        )
        .await
        .mutation();

    debug!(vehicle_id = result.insert_id, "Vehicle created");
    Ok(created("车辆添加成功", "vehicleId", result))
}

/// `PUT /api/vehicles/{id}`
pub async fn update_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute(
            "UPDATE vehicles SET plate_number = ?, vehicle_type = ?, brand = ?, model = ?, \
             update_time = ? WHERE id = ?",
            vec![
                fields.value("plate_number"),
                fields.value("vehicle_type"),
                fields.value("brand"),
                fields.value("model"),
                now_string().into(),
                id_param(&id),
            ],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("车辆更新成功"))
}

/// `DELETE /api/vehicles/{id}`
pub async fn delete_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute("DELETE FROM vehicles WHERE id = ?", vec![id_param(&id)])
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    Ok(message("车辆删除成功"))
}
