//! Background connectivity probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::BackendError;

use super::{Endpoint, EndpointRole, EndpointSet};

/// Probes the primary, then the backup, and records which one to use.
///
/// Probes are serialised. A caller that had to wait while another probe ran
/// takes that probe's outcome instead of starting a second one.
#[derive(Debug)]
pub struct HealthProber {
    endpoints: Arc<EndpointSet>,
    timeout: Duration,
    probe_lock: Mutex<()>,
    completed: AtomicU64,
}

impl HealthProber {
    /// Creates a prober. Each ping is bounded by `timeout`.
    pub fn new(endpoints: Arc<EndpointSet>, timeout: Duration) -> Self {
        Self {
            endpoints,
            timeout,
            probe_lock: Mutex::new(()),
            completed: AtomicU64::new(0),
        }
    }

    pub fn endpoints(&self) -> &Arc<EndpointSet> {
        &self.endpoints
    }

    /// Number of probes completed so far.
    pub fn probe_count(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Runs one probe cycle and returns whether any endpoint answered.
    ///
    /// On primary success the primary becomes active. Otherwise a reachable
    /// backup becomes active. When neither answers the active endpoint is
    /// left as it was and the state is marked disconnected.
    pub async fn probe(&self) -> bool {
        let seen = self.completed.load(Ordering::Acquire);
        let _guard = self.probe_lock.lock().await;
        if self.completed.load(Ordering::Acquire) != seen {
            return self.endpoints.state().is_connected();
        }

        let connected = self.run_probe().await;

        self.endpoints.state().record_probe();
        self.completed.fetch_add(1, Ordering::AcqRel);
        connected
    }

    async fn run_probe(&self) -> bool {
        let state = self.endpoints.state();
        let previous = state.active_role();
        let was_connected = state.is_connected();

        let primary = self.endpoints.primary();
        match self.ping(primary).await {
            Ok(elapsed) => {
                primary.set_reachable(true);
                state.set_active_role(EndpointRole::Primary);
                state.set_connected(true);
                if previous != EndpointRole::Primary || !was_connected {
                    info!(
                        endpoint = %primary.backend().endpoint(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Primary database connected"
                    );
                }
                return true;
            }
            Err(e) => {
                primary.set_reachable(false);
                warn!(
                    endpoint = %primary.backend().endpoint(),
                    error = %e,
                    "Primary database unreachable"
                );
            }
        }

        let Some(backup) = self.endpoints.backup() else {
            state.set_connected(false);
            return false;
        };

        match self.ping(backup).await {
            Ok(elapsed) => {
                backup.set_reachable(true);
                state.set_active_role(EndpointRole::Backup);
                state.set_connected(true);
                if previous != EndpointRole::Backup || !was_connected {
                    info!(
                        endpoint = %backup.backend().endpoint(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Switched to backup database"
                    );
                }
                true
            }
            Err(e) => {
                backup.set_reachable(false);
                state.set_connected(false);
                warn!(
                    endpoint = %backup.backend().endpoint(),
                    error = %e,
                    active = %previous,
                    "Backup database unreachable, keeping last active endpoint"
                );
                false
            }
        }
    }

    /// Acquires and releases one connection, bounded by the timeout.
    async fn ping(&self, endpoint: &Endpoint) -> Result<Duration, BackendError> {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, endpoint.backend().ping()).await {
            Ok(Ok(())) => Ok(start.elapsed()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BackendError::Timeout {
                backend_name: endpoint.backend().name().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Spawns the fixed-interval probe loop. The first probe runs
    /// immediately.
    pub fn start(self: &Arc<Self>, every: Duration) -> ProberHandle {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let prober = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = rx.recv() => {
                        debug!("Health prober shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let connected = prober.probe().await;
                        debug!(
                            connected,
                            active = %prober.endpoints.state().active_role(),
                            "Database connectivity probed"
                        );
                    }
                }
            }
        });

        ProberHandle {
            shutdown_tx: Some(tx),
            handle: Some(handle),
        }
    }
}

/// Handle to a running probe loop. Dropping it also ends the loop.
#[derive(Debug)]
pub struct ProberHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProberHandle {
    /// Stops the loop and waits for it to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
    use crate::core::SqlBackend;

    fn reachable() -> Arc<dyn SqlBackend> {
        Arc::new(SqliteBackend::in_memory().unwrap())
    }

    fn unreachable() -> Arc<dyn SqlBackend> {
        let config = SqliteBackendConfig {
            connection_timeout_ms: 100,
            ..Default::default()
        };
        Arc::new(SqliteBackend::with_config("/nonexistent-dir/hytt/db.sqlite", config).unwrap())
    }

    #[tokio::test]
    async fn test_probe_primary_reachable() {
        let set = Arc::new(EndpointSet::new(reachable(), Some(reachable())));
        let prober = HealthProber::new(set.clone(), Duration::from_secs(5));

        assert!(prober.probe().await);
        assert!(set.primary().is_reachable());
        assert!(set.state().is_connected());
        assert_eq!(set.state().active_role(), EndpointRole::Primary);
        assert_eq!(prober.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_probe_without_backup() {
        let set = Arc::new(EndpointSet::new(unreachable(), None));
        let prober = HealthProber::new(set.clone(), Duration::from_secs(5));

        assert!(!prober.probe().await);
        assert!(!set.state().is_connected());
        assert!(set.state().has_probed());
        assert_eq!(set.state().active_role(), EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let set = Arc::new(EndpointSet::new(reachable(), None));
        let prober = Arc::new(HealthProber::new(set.clone(), Duration::from_secs(5)));

        let mut handle = prober.start(Duration::from_secs(3600));
        while prober.probe_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_running());
        assert!(set.state().is_connected());

        handle.stop().await;
        assert!(!handle.is_running());
    }
}
