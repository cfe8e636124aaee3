//! # hytt-rest - Booking REST API
//!
//! The HTTP layer of the HYTT booking backend: users, vehicles, bookings,
//! vehicle appointments, home page banners and notices, served as JSON over
//! a [`QueryExecutor`].
//!
//! ## Always-answer behaviour
//!
//! The executor never fails outward. A statement that cannot reach a
//! database yields an empty row list or `{affectedRows: 0, insertId: 0}`,
//! and the handlers shape whatever they receive:
//!
//! - lookups that find nothing answer `404`
//! - creates answer `201` with the reported insert id (0 when offline)
//! - updates and deletes that touch no rows answer `404`
//! - the banner listing falls back to two built-in banners
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hytt_rest::{create_app_with_config, ServerConfig};
//! use hytt_persistence::executor::PooledExecutor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let executor = PooledExecutor::from_config(&config.database_config())?;
//!
//!     let app = create_app_with_config(Arc::new(executor), config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Collection | Root | Item | Extra |
//! |------------|------|------|-------|
//! | `/api/users` | GET, POST | GET, PUT, DELETE | `GET /openid/{openid}` |
//! | `/api/vehicles` | GET, POST | GET, PUT, DELETE | `GET /user/{userId}`, `GET /plate/{plate}` |
//! | `/api/bookings` | GET, POST | GET, PUT, DELETE | `GET /user/{userId}`, `GET /date/{date}`, `PUT /{id}/status` |
//! | `/api/vehicle-appointments` | GET, POST | GET, PUT, DELETE | `GET /phone/..`, `/license/..`, `/date/..`, `/user/..`, `PUT /{id}/status` |
//! | `/api/banners` | GET, POST | GET, PUT, DELETE | `GET /all`, `PATCH /{id}/status` |
//! | `/api/notices` | GET, POST | GET, PUT, DELETE | `GET /latest`, `GET /all`, `GET /status`, `PATCH /{id}/status` |
//!
//! ## Architecture
//!
//! - [`error`] - Error type and JSON error bodies
//! - [`config`] - Server configuration
//! - [`state`] - Application state (executor, configuration, caches)
//! - [`handlers`] - HTTP request handlers for each collection
//! - [`extractors`] - Body and query parameter extractors
//! - [`responses`] - Shared response shaping
//! - [`routing`] - Route configuration

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hytt_persistence::executor::QueryExecutor;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

/// Creates the Axum application with default configuration.
pub fn create_app(executor: Arc<dyn QueryExecutor>) -> Router {
    create_app_with_config(executor, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
pub fn create_app_with_config(executor: Arc<dyn QueryExecutor>, config: ServerConfig) -> Router {
    create_app_with_state(AppState::new(executor, config))
}

/// Creates the Axum application around an existing state.
///
/// Use this when the caller needs the state's caches, for example to start
/// their sweepers.
pub fn create_app_with_state(state: AppState) -> Router {
    let config = state.config().clone();
    info!(
        backend = %state.executor().kind(),
        "Creating REST API server"
    );

    let mut router = routing::create_routes(state);

    if let Some(dir) = config.static_dir.as_deref() {
        info!(dir, "Serving static files under /static");
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    let router = router.fallback(route_not_found);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

async fn route_not_found() -> RestError {
    RestError::RouteNotFound
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "Request handler panicked");

    RestError::InternalError {
        message: "请联系管理员".to_string(),
    }
    .into_response()
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut layer = CorsLayer::new().max_age(Duration::from_secs(config.cors_max_age));

    if config.cors_origins == "*" {
        layer = layer.allow_origin(cors::Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        layer = layer.allow_methods(cors::Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        layer = layer.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        layer = layer.allow_headers(cors::Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    layer
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hytt_server={level},hytt_rest={level},hytt_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
