//! Application state for the booking REST API.
//!
//! Holds the query executor, the configuration and the response caches
//! shared by every handler.

use std::sync::Arc;
use std::time::Instant;

use hytt_persistence::cache::ResponseCache;
use hytt_persistence::executor::QueryExecutor;

use crate::config::ServerConfig;

/// Shared application state for the REST API.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use hytt_persistence::executor::OfflineExecutor;
/// use hytt_rest::{AppState, ServerConfig};
///
/// let state = AppState::new(Arc::new(OfflineExecutor::new()), ServerConfig::default());
/// assert!(state.notice_cache().is_empty());
/// ```
#[derive(Clone)]
pub struct AppState {
    executor: Arc<dyn QueryExecutor>,

    config: Arc<ServerConfig>,

    /// Notice pages and details.
    notice_cache: Arc<ResponseCache>,

    /// The enabled banner list.
    banner_cache: Arc<ResponseCache>,

    started_at: Instant,
}

impl AppState {
    /// Creates a new AppState with fresh caches.
    pub fn new(executor: Arc<dyn QueryExecutor>, config: ServerConfig) -> Self {
        let notice_cache = Arc::new(ResponseCache::new(config.notice_list_ttl()));
        let banner_cache = Arc::new(ResponseCache::new(config.banner_list_ttl()));
        Self {
            executor,
            config: Arc::new(config),
            notice_cache,
            banner_cache,
            started_at: Instant::now(),
        }
    }

    /// Returns the query executor.
    pub fn executor(&self) -> &dyn QueryExecutor {
        self.executor.as_ref()
    }

    /// Returns a clone of the executor Arc.
    pub fn executor_arc(&self) -> Arc<dyn QueryExecutor> {
        Arc::clone(&self.executor)
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn notice_cache(&self) -> &Arc<ResponseCache> {
        &self.notice_cache
    }

    pub fn banner_cache(&self) -> &Arc<ResponseCache> {
        &self.banner_cache
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
