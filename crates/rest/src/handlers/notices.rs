//! Notice handlers.
//!
//! `[base]/api/notices`
//!
//! Pages and details are cached in the notice cache under
//! `notices_page_{page}_size_{pageSize}` and `notice_detail_{id}`. Every
//! mutation clears the whole cache.

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use hytt_persistence::types::Row;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Fields, LatestQuery, Pagination, id_param};
use crate::responses::{created, message, now_string, require_changed, today_string};
use crate::state::AppState;

const NOT_FOUND: &str = "公告不存在";
const PREVIEW_CHARS: usize = 100;

/// One page of the public notice listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticePage {
    pub total: i64,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    pub list: Vec<Row>,
}

/// A notice as shown on the home page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeSummary {
    pub id: Value,
    pub title: Value,
    pub content_preview: String,
    pub date: String,
    pub is_important: bool,
}

impl NoticeSummary {
    fn from_row(row: &Row) -> Self {
        let date = row
            .get("publish_time")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().take(10).collect())
            .unwrap_or_else(today_string);
        Self {
            id: row.get("id").cloned().unwrap_or(Value::Null),
            title: row.get("title").cloned().unwrap_or(Value::Null),
            content_preview: preview(row.get("content").and_then(Value::as_str).unwrap_or("")),
            date,
            is_important: row.get("is_important").is_some_and(is_flag_set),
        }
    }
}

/// The first hundred characters of `content`, with `...` when cut.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Whether a stored flag is set: `1` or `true`.
fn is_flag_set(value: &Value) -> bool {
    value.as_i64() == Some(1) || value.as_bool() == Some(true)
}

/// `GET /api/notices?page=&pageSize=`
///
/// Enabled, unexpired notices, important first, then newest. A page is
/// cached only when the count query answered, so a listing built while the
/// database was unreachable is not kept.
pub async fn list_notices_handler(
    State(state): State<AppState>,
    pagination: Pagination,
) -> Json<Value> {
    let cache_key = format!(
        "notices_page_{}_size_{}",
        pagination.page(),
        pagination.page_size()
    );
    if let Some(cached) = state.notice_cache().get(&cache_key) {
        debug!(page = pagination.page(), "Serving notice page from cache");
        return Json(cached);
    }
    let generation = state.notice_cache().generation();

    let now = now_string();
    let count = state
        .executor()
        .execute(
            "SELECT COUNT(*) AS total FROM notices \
             WHERE status = 1 AND (end_time IS NULL OR end_time > ?)",
            vec![now.clone().into()],
        )
        .await
        .first_row();
    let total = count
        .as_ref()
        .and_then(|row| row.get("total"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let list = state
        .executor()
        .execute(
            "SELECT id, title, substr(content, 1, 100) AS content_preview, publish_time, \
             is_important, substr(publish_time, 1, 10) AS date \
             FROM notices \
             WHERE status = 1 AND (end_time IS NULL OR end_time > ?) \
             ORDER BY is_important DESC, publish_time DESC \
             LIMIT ? OFFSET ?",
            vec![
                now.into(),
                pagination.page_size().into(),
                pagination.offset().into(),
            ],
        )
        .await
        .into_rows();

    let page = NoticePage {
        total,
        page: pagination.page(),
        page_size: pagination.page_size(),
        list,
    };
    let body = json!(page);
    if count.is_some() {
        state.notice_cache().set_if_generation(
            cache_key,
            body.clone(),
            state.config().notice_list_ttl(),
            generation,
        );
    }
    Json(body)
}

/// `GET /api/notices/latest?limit=&force=`
///
/// Always read from the database. `force=true` also clears the notice cache.
pub async fn latest_notices_handler(
    State(state): State<AppState>,
    latest: LatestQuery,
) -> Json<Vec<NoticeSummary>> {
    if latest.force {
        state.notice_cache().clear();
    }

    let rows = state
        .executor()
        .execute(
            "SELECT id, title, content, publish_time, is_important FROM notices \
             WHERE status = 1 ORDER BY is_important DESC, publish_time DESC LIMIT ?",
            vec![latest.limit.into()],
        )
        .await
        .into_rows();

    debug!(limit = latest.limit, found = rows.len(), "Latest notices");
    Json(rows.iter().map(NoticeSummary::from_row).collect())
}

/// `GET /api/notices/all`: every notice for administration.
pub async fn list_all_notices_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    Json(
        state
            .executor()
            .query(
                "SELECT id, title, substr(content, 1, 100) AS content_preview, publish_time, \
                 end_time, is_important, status, create_time, update_time \
                 FROM notices ORDER BY is_important DESC, publish_time DESC",
            )
            .await
            .into_rows(),
    )
}

/// `GET /api/notices/status`
pub async fn notice_service_status_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
        "service": "notices"
    }))
}

/// `GET /api/notices/{id}`
///
/// - `200 OK` - the enabled notice, cached for the detail TTL
/// - `404 Not Found` - `{"error": "公告不存在"}`
pub async fn get_notice_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let cache_key = format!("notice_detail_{}", id);
    if let Some(cached) = state.notice_cache().get(&cache_key) {
        return Ok(Json(cached));
    }
    let generation = state.notice_cache().generation();

    let mut row = state
        .executor()
        .execute(
            "SELECT id, title, content, substr(content, 1, 100) AS content_preview, \
             substr(publish_time, 1, 10) AS date, is_important, status \
             FROM notices WHERE id = ? AND status = 1",
            vec![id_param(&id)],
        )
        .await
        .first_row()
        .ok_or_else(|| RestError::Missing {
            error: NOT_FOUND.to_string(),
        })?;

    let important = row.get("is_important").is_some_and(is_flag_set);
    row.insert("is_important".to_string(), Value::Bool(important));

    let detail = Value::Object(row);
    state.notice_cache().set_if_generation(
        cache_key,
        detail.clone(),
        state.config().notice_detail_ttl(),
        generation,
    );
    Ok(Json(detail))
}

/// `POST /api/notices`
///
/// Requires `title`. `publish_time` defaults to now, `is_important` to 0
/// and `status` to 1.
pub async fn create_notice_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(&["title"], "公告标题不能为空")?;

    let now = now_string();
    let result = state
        .executor()
        .execute(
            "INSERT INTO notices \
             (title, content, publish_time, end_time, is_important, status, create_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            vec![
                fields.value("title"),
                fields.value("content"),
                fields.truthy_or("publish_time", now.clone()),
                fields.value("end_time"),
                fields.value_or("is_important", 0),
                fields.value_or("status", 1),
                now.into(),
            ],
        )
        .await
        .mutation();

    state.notice_cache().clear();
    debug!(notice_id = result.insert_id, "Notice created");
    Ok(created("公告创建成功", "noticeId", result))
}

/// `PUT /api/notices/{id}`
///
/// Replaces every field; omitted fields become `NULL`.
pub async fn update_notice_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    fields.require(&["title"], "公告标题不能为空")?;

    let result = state
        .executor()
        .execute(
            "UPDATE notices SET title = ?, content = ?, publish_time = ?, end_time = ?, \
             is_important = ?, status = ?, update_time = ? WHERE id = ?",
            vec![
                fields.value("title"),
                fields.value("content"),
                fields.value("publish_time"),
                fields.value("end_time"),
                fields.value("is_important"),
                fields.value("status"),
                now_string().into(),
                id_param(&id),
            ],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.notice_cache().clear();
    Ok(message("公告更新成功"))
}

/// `DELETE /api/notices/{id}`
pub async fn delete_notice_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute("DELETE FROM notices WHERE id = ?", vec![id_param(&id)])
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.notice_cache().clear();
    Ok(message("公告删除成功"))
}

/// `PATCH /api/notices/{id}/status`
pub async fn update_notice_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    if !fields.contains("status") {
        return Err(RestError::bad_request("状态不能为空"));
    }

    let result = state
        .executor()
        .execute(
            "UPDATE notices SET status = ?, update_time = ? WHERE id = ?",
            vec![fields.value("status"), now_string().into(), id_param(&id)],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.notice_cache().clear();
    Ok(message("公告状态更新成功"))
}
