//! Banner handlers.
//!
//! `[base]/api/banners`
//!
//! The public listing is cached in the banner cache and every mutation
//! clears it. Image URLs are rewritten to paths this server serves.

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use hytt_persistence::types::Row;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::extractors::{Fields, id_param};
use crate::responses::{created, message, now_string, require_changed};
use crate::state::AppState;

const NOT_FOUND: &str = "轮播图不存在";
const ENABLED_KEY: &str = "banners_enabled";
const UPLOAD_PREFIX: &str = "/static/uploads/banners/";

/// Banners shown when none are enabled.
pub fn default_banners() -> Value {
    json!([
        {
            "id": 1,
            "title": "慧眼通途欢迎您",
            "image_url": "/static/images/banner1.jpg",
            "link_url": ""
        },
        {
            "id": 2,
            "title": "智能预约系统",
            "image_url": "/static/images/banner2.jpg",
            "link_url": ""
        }
    ])
}

/// Prefixes relative image paths with `/static`. Absolute `http` URLs and
/// paths already under `/static` are unchanged.
pub fn static_image_url(url: &str) -> String {
    if url.is_empty() || url.starts_with("/static") || url.starts_with("http") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("/static{}", url)
    } else {
        format!("/static/{}", url)
    }
}

/// Like [`static_image_url`], but uploads from the CMS are mapped onto the
/// image directory this server serves.
pub fn public_image_url(url: &str) -> String {
    match url.strip_prefix(UPLOAD_PREFIX) {
        Some(rest) => {
            let filename = rest.rsplit('/').next().unwrap_or(rest);
            format!("/static/images/{}", filename)
        }
        None => static_image_url(url),
    }
}

fn rewrite_image_urls(rows: &mut [Row], rewrite: fn(&str) -> String) {
    for row in rows {
        if let Some(Value::String(url)) = row.get_mut("image_url") {
            *url = rewrite(url);
        }
    }
}

/// `GET /api/banners`: enabled banners in `sort_order`.
///
/// Falls back to [`default_banners`] when the query returns nothing. Only a
/// non-empty listing is cached.
pub async fn list_banners_handler(State(state): State<AppState>) -> Json<Value> {
    if let Some(cached) = state.banner_cache().get(ENABLED_KEY) {
        debug!("Serving banners from cache");
        return Json(cached);
    }
    let generation = state.banner_cache().generation();

    let mut rows = state
        .executor()
        .query(
            "SELECT id, title, image_url, link_url FROM banners WHERE status = 1 \
             ORDER BY sort_order ASC",
        )
        .await
        .into_rows();

    if rows.is_empty() {
        debug!("No enabled banners, serving defaults");
        return Json(default_banners());
    }

    rewrite_image_urls(&mut rows, public_image_url);
    let listing = Value::Array(rows.into_iter().map(Value::Object).collect());
    state.banner_cache().set_if_generation(
        ENABLED_KEY,
        listing.clone(),
        state.config().banner_list_ttl(),
        generation,
    );
    Json(listing)
}

/// `GET /api/banners/all`: every banner, enabled or not.
pub async fn list_all_banners_handler(State(state): State<AppState>) -> Json<Vec<Row>> {
    let mut rows = state
        .executor()
        .query(
            "SELECT id, title, image_url, link_url, sort_order, status, create_time, update_time \
             FROM banners ORDER BY sort_order ASC",
        )
        .await
        .into_rows();
    rewrite_image_urls(&mut rows, static_image_url);
    Json(rows)
}

/// `GET /api/banners/{id}`
pub async fn get_banner_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Row>> {
    state
        .executor()
        .execute("SELECT * FROM banners WHERE id = ?", vec![id_param(&id)])
        .await
        .first_row()
        .map(Json)
        .ok_or_else(|| RestError::not_found(NOT_FOUND))
}

/// `POST /api/banners`
///
/// Requires `image_url`. `sort_order` defaults to 0 and `status` to 1.
pub async fn create_banner_handler(
    State(state): State<AppState>,
    fields: Fields,
) -> RestResult<Response> {
    fields.require(&["image_url"], "图片URL不能为空")?;

    let result = state
        .executor()
        .execute(
            "INSERT INTO banners (title, image_url, link_url, sort_order, status, create_time) \
             VALUES (?, ?, ?, ?, ?, ?)",
            vec![
                fields.value("title"),
                fields.value("image_url"),
                fields.value("link_url"),
                fields.truthy_or("sort_order", 0),
                fields.value_or("status", 1),
                now_string().into(),
            ],
        )
        .await
        .mutation();

    state.banner_cache().clear();
    Ok(created("轮播图创建成功", "bannerId", result))
}

/// `PUT /api/banners/{id}`
pub async fn update_banner_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    fields: Fields,
) -> RestResult<Json<Value>> {
    fields.require(&["image_url"], "图片URL不能为空")?;

    let result = state
        .executor()
        .execute(
            "UPDATE banners SET title = ?, image_url = ?, link_url = ?, sort_order = ?, \
             status = ?, update_time = ? WHERE id = ?",
            vec![
                fields.value("title"),
                fields.value("image_url"),
                fields.value("link_url"),
                fields.value("sort_order"),
                fields.value("status"),
                now_string().into(),
                id_param(&id),
            ],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.banner_cache().clear();
    Ok(message("轮播图更新成功"))
}

/// `DELETE /api/banners/{id}`
pub async fn delete_banner_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RestResult<Json<Value>> {
    let result = state
        .executor()
        .execute("DELETE FROM banners WHERE id = ?", vec![id_param(&id)])
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.banner_cache().clear();
    Ok(message("轮播图删除成功"))
}

/// `PATCH /api/banners/{id}/status`
///
/// `status` must be sent, though it may be 0 or `null`.
pub async fn update_banner_status_handler(
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
            "UPDATE banners SET status = ?, update_time = ? WHERE id = ?",
            vec![fields.value("status"), now_string().into(), id_param(&id)],
        )
        .await
        .mutation();

    require_changed(result, NOT_FOUND)?;
    state.banner_cache().clear();
    Ok(message("轮播图状态更新成功"))
}
