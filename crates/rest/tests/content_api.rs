//! Notice and banner endpoint tests.
//!
//! Covers paging, the response cache and its invalidation, the default
//! banners, and image URL rewriting.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use hytt_persistence::types::SqlValue;

use common::{TestApp, id_from};

async fn create_notice(app: &TestApp, title: &str, publish_time: &str, important: i64) -> i64 {
    let response = app
        .server
        .post("/api/notices")
        .json(&json!({
            "title": title,
            "content": format!("{}的内容", title),
            "publish_time": publish_time,
            "is_important": important
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    id_from(&response.json::<Value>(), "noticeId")
}

async fn insert_notice_directly(app: &TestApp, title: &str) {
    app.exec(
        "INSERT INTO notices (title, content, publish_time) VALUES (?, ?, ?)",
        vec![title.into(), "直接写入".into(), "2024-01-01 00:00:00".into()],
    )
    .await;
}

// =============================================================================
// Notices
// =============================================================================

mod notices {
    use super::*;

    #[tokio::test]
    async fn test_paging_orders_important_first() {
        let app = TestApp::sqlite().await;
        create_notice(&app, "旧公告", "2024-01-01 08:00:00", 0).await;
        create_notice(&app, "新公告", "2024-03-01 08:00:00", 0).await;
        create_notice(&app, "重要公告", "2023-12-01 08:00:00", 1).await;

        let page: Value = app
            .server
            .get("/api/notices")
            .add_query_param("page", 1)
            .add_query_param("pageSize", 2)
            .await
            .json();

        assert_eq!(page["total"], 3);
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 2);
        let list = page["list"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["title"], "重要公告");
        assert_eq!(list[1]["title"], "新公告");
        assert_eq!(list[1]["date"], "2024-03-01");

        let second: Value = app
            .server
            .get("/api/notices?page=2&pageSize=2")
            .await
            .json();
        assert_eq!(second["list"].as_array().unwrap().len(), 1);
        assert_eq!(second["list"][0]["title"], "旧公告");
    }

    #[tokio::test]
    async fn test_invalid_paging_falls_back_to_defaults() {
        let app = TestApp::sqlite().await;

        let page: Value = app
            .server
            .get("/api/notices?page=abc&pageSize=-3")
            .await
            .json();
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageSize"], 10);
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn test_expired_and_disabled_notices_hidden() {
        let app = TestApp::sqlite().await;
        create_notice(&app, "可见", "2024-01-01 08:00:00", 0).await;
        app.exec(
            "INSERT INTO notices (title, publish_time, end_time) VALUES (?, ?, ?)",
            vec!["过期".into(), "2020-01-01 00:00:00".into(), "2020-02-01 00:00:00".into()],
        )
        .await;
        app.exec(
            "INSERT INTO notices (title, publish_time, status) VALUES (?, ?, ?)",
            vec!["停用".into(), "2024-02-01 00:00:00".into(), SqlValue::Integer(0)],
        )
        .await;

        let page: Value = app.server.get("/api/notices").await.json();
        assert_eq!(page["total"], 1);
        assert_eq!(page["list"][0]["title"], "可见");
    }

    #[tokio::test]
    async fn test_page_cached_until_mutation() {
        let app = TestApp::sqlite().await;
        create_notice(&app, "第一条", "2024-01-01 08:00:00", 0).await;

        let first: Value = app.server.get("/api/notices").await.json();
        assert_eq!(first["total"], 1);
        assert_eq!(app.state.notice_cache().len(), 1);

        insert_notice_directly(&app, "绕过缓存").await;
        let cached: Value = app.server.get("/api/notices").await.json();
        assert_eq!(cached["total"], 1);

        create_notice(&app, "第三条", "2024-02-01 08:00:00", 0).await;
        let fresh: Value = app.server.get("/api/notices").await.json();
        assert_eq!(fresh["total"], 3);
    }

    #[tokio::test]
    async fn test_latest_force_clears_cache() {
        let app = TestApp::sqlite().await;
        create_notice(&app, "第一条", "2024-01-01 08:00:00", 0).await;
        app.server.get("/api/notices").await;
        assert!(!app.state.notice_cache().is_empty());

        app.server.get("/api/notices/latest").await.assert_status_ok();
        assert!(!app.state.notice_cache().is_empty());

        app.server
            .get("/api/notices/latest?force=true")
            .await
            .assert_status_ok();
        assert!(app.state.notice_cache().is_empty());
    }

    #[tokio::test]
    async fn test_latest_summaries() {
        let app = TestApp::sqlite().await;
        create_notice(&app, "普通", "2024-02-01 08:00:00", 0).await;
        create_notice(&app, "重要", "2024-01-01 08:00:00", 1).await;
        create_notice(&app, "第三", "2024-03-01 08:00:00", 0).await;

        let latest: Value = app.server.get("/api/notices/latest?limit=2").await.json();
        let latest = latest.as_array().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0]["title"], "重要");
        assert_eq!(latest[0]["is_important"], true);
        assert_eq!(latest[0]["date"], "2024-01-01");
        assert_eq!(latest[0]["content_preview"], "重要的内容");
        assert_eq!(latest[1]["is_important"], false);
    }

    #[tokio::test]
    async fn test_detail_cached_and_missing_uses_error_key() {
        let app = TestApp::sqlite().await;
        let id = create_notice(&app, "详情", "2024-01-01 08:00:00", 1).await;

        let response = app.server.get(&format!("/api/notices/{}", id)).await;
        response.assert_status_ok();
        let detail: Value = response.json();
        assert_eq!(detail["title"], "详情");
        assert_eq!(detail["is_important"], true);
        assert!(
            app.state
                .notice_cache()
                .get(&format!("notice_detail_{}", id))
                .is_some()
        );

        let response = app.server.get("/api/notices/9999").await;
        response.assert_status_not_found();
        response.assert_json(&json!({"error": "公告不存在"}));
    }

    #[tokio::test]
    async fn test_disabling_notice_hides_detail() {
        let app = TestApp::sqlite().await;
        let id = create_notice(&app, "将停用", "2024-01-01 08:00:00", 0).await;
        app.server.get(&format!("/api/notices/{}", id)).await.assert_status_ok();

        let response = app
            .server
            .patch(&format!("/api/notices/{}/status", id))
            .json(&json!({"status": 0}))
            .await;
        response.assert_json(&json!({"message": "公告状态更新成功"}));

        app.server
            .get(&format!("/api/notices/{}", id))
            .await
            .assert_status_not_found();

        let all: Value = app.server.get("/api/notices/all").await.json();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_notice_requires_title() {
        let app = TestApp::sqlite().await;

        let response = app
            .server
            .post("/api/notices")
            .json(&json!({"content": "无标题"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "公告标题不能为空"}));
    }

    #[tokio::test]
    async fn test_offline_page_not_cached() {
        let app = TestApp::offline();

        let page: Value = app.server.get("/api/notices").await.json();
        assert_eq!(page, json!({"total": 0, "page": 1, "pageSize": 10, "list": []}));
        assert!(app.state.notice_cache().is_empty());
    }
}

// =============================================================================
// Banners
// =============================================================================

mod banners {
    use super::*;

    #[tokio::test]
    async fn test_empty_table_serves_defaults_without_caching() {
        let app = TestApp::sqlite().await;

        let banners: Value = app.server.get("/api/banners").await.json();
        assert_eq!(banners, hytt_rest::handlers::banners::default_banners());
        assert!(app.state.banner_cache().is_empty());

        app.exec(
            "INSERT INTO banners (title, image_url) VALUES (?, ?)",
            vec!["新横幅".into(), "/images/new.jpg".into()],
        )
        .await;
        let banners: Value = app.server.get("/api/banners").await.json();
        assert_eq!(banners.as_array().unwrap().len(), 1);
        assert_eq!(banners[0]["image_url"], "/static/images/new.jpg");
    }

    #[tokio::test]
    async fn test_offline_serves_defaults() {
        let app = TestApp::offline();

        let response = app.server.get("/api/banners").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()[0]["title"], "慧眼通途欢迎您");
    }

    #[tokio::test]
    async fn test_listing_cached_and_cleared_on_status_change() {
        let app = TestApp::sqlite().await;
        let response = app
            .server
            .post("/api/banners")
            .json(&json!({
                "title": "上传",
                "image_url": "/static/uploads/banners/2024/spring.jpg",
                "sort_order": 2
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let id = id_from(&response.json::<Value>(), "bannerId");

        let banners: Value = app.server.get("/api/banners").await.json();
        assert_eq!(banners[0]["image_url"], "/static/images/spring.jpg");
        assert_eq!(app.state.banner_cache().len(), 1);

        app.server
            .patch(&format!("/api/banners/{}/status", id))
            .json(&json!({"status": 0}))
            .await
            .assert_status_ok();
        assert!(app.state.banner_cache().is_empty());

        let banners: Value = app.server.get("/api/banners").await.json();
        assert_eq!(banners, hytt_rest::handlers::banners::default_banners());

        let all: Value = app.server.get("/api/banners/all").await.json();
        assert_eq!(all[0]["status"], 0);
        assert_eq!(
            all[0]["image_url"],
            "/static/uploads/banners/2024/spring.jpg"
        );
    }

    #[tokio::test]
    async fn test_status_patch_requires_status() {
        let app = TestApp::sqlite().await;

        let response = app
            .server
            .patch("/api/banners/1/status")
            .json(&json!({"title": "x"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "状态不能为空"}));
    }

    #[tokio::test]
    async fn test_create_requires_image_url() {
        let app = TestApp::sqlite().await;

        let response = app
            .server
            .post("/api/banners")
            .json(&json!({"title": "无图"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"message": "图片URL不能为空"}));
    }

    #[tokio::test]
    async fn test_missing_banner_returns_404() {
        let app = TestApp::sqlite().await;

        let response = app.server.delete("/api/banners/5").await;
        response.assert_status_not_found();
        response.assert_json(&json!({"message": "轮播图不存在"}));
    }
}
