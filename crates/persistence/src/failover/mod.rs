//! Connection resolution between a primary and an optional backup endpoint.
//!
//! [`ConnectionState`] is the single record shared by the
//! [`HealthProber`] (its only writer) and the query executor (a reader). The
//! resolver is [`EndpointSet::resolve_active_endpoint`]: it reads the state
//! and never changes it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hytt_persistence::config::DatabaseConfig;
//! use hytt_persistence::failover::{EndpointRole, EndpointSet, HealthProber};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::sqlite("primary.db").with_backup_path("backup.db");
//! let endpoints = Arc::new(EndpointSet::from_config(&config)?);
//!
//! // Before any probe the primary is assumed.
//! assert_eq!(endpoints.resolve_active_endpoint().role(), EndpointRole::Primary);
//!
//! let prober = Arc::new(HealthProber::new(endpoints.clone(), Duration::from_secs(10)));
//! prober.probe().await;
//! # Ok(())
//! # }
//! ```

mod prober;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::backends;
use crate::config::DatabaseConfig;
use crate::core::{BackendKind, PoolStats, SqlBackend};
use crate::error::ConfigError;

pub use prober::{HealthProber, ProberHandle};

/// Which of the two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Backup,
}

impl EndpointRole {
    fn as_u8(self) -> u8 {
        match self {
            EndpointRole::Primary => 0,
            EndpointRole::Backup => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => EndpointRole::Backup,
            _ => EndpointRole::Primary,
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Primary => write!(f, "primary"),
            EndpointRole::Backup => write!(f, "backup"),
        }
    }
}

/// A database endpoint and its last known reachability.
#[derive(Debug)]
pub struct Endpoint {
    role: EndpointRole,
    backend: Arc<dyn SqlBackend>,
    reachable: AtomicBool,
}

impl Endpoint {
    /// Wraps a backend. Reachability starts unknown (`false`).
    pub fn new(role: EndpointRole, backend: Arc<dyn SqlBackend>) -> Self {
        Self {
            role,
            backend,
            reachable: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    pub fn backend(&self) -> &Arc<dyn SqlBackend> {
        &self.backend
    }

    /// Result of the most recent probe of this endpoint.
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    fn snapshot(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            role: self.role,
            kind: self.backend.kind(),
            endpoint: self.backend.endpoint(),
            reachable: self.is_reachable(),
            pool: self.backend.pool_stats(),
        }
    }
}

/// Process-wide connectivity state.
///
/// Fields are independent atomics: readers may observe a mix of two
/// consecutive probes, which is acceptable for routing decisions.
#[derive(Debug)]
pub struct ConnectionState {
    active: AtomicU8,
    connected: AtomicBool,
    probed: AtomicBool,
    last_probe: RwLock<Option<DateTime<Utc>>>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    /// Primary active, not connected, never probed.
    pub fn new() -> Self {
        Self {
            active: AtomicU8::new(EndpointRole::Primary.as_u8()),
            connected: AtomicBool::new(false),
            probed: AtomicBool::new(false),
            last_probe: RwLock::new(None),
        }
    }

    pub fn active_role(&self) -> EndpointRole {
        EndpointRole::from_u8(self.active.load(Ordering::Acquire))
    }

    pub(crate) fn set_active_role(&self, role: EndpointRole) {
        self.active.store(role.as_u8(), Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Whether at least one probe has completed.
    pub fn has_probed(&self) -> bool {
        self.probed.load(Ordering::Acquire)
    }

    pub fn last_probe_time(&self) -> Option<DateTime<Utc>> {
        *self.last_probe.read()
    }

    pub(crate) fn record_probe(&self) {
        *self.last_probe.write() = Some(Utc::now());
        self.probed.store(true, Ordering::Release);
    }
}

/// Serializable view of one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub role: EndpointRole,
    pub kind: BackendKind,
    pub endpoint: String,
    pub reachable: bool,
    pub pool: PoolStats,
}

/// Serializable view of the connectivity state.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    pub kind: BackendKind,
    pub active: EndpointRole,
    pub connected: bool,
    pub probed: bool,
    pub last_probe: Option<DateTime<Utc>>,
    pub endpoints: Vec<EndpointSnapshot>,
}

impl ConnectionSnapshot {
    /// Snapshot for a process with no database at all.
    pub fn offline() -> Self {
        Self {
            kind: BackendKind::Offline,
            active: EndpointRole::Primary,
            connected: false,
            probed: false,
            last_probe: None,
            endpoints: Vec::new(),
        }
    }

    /// Whether the backup endpoint is serving queries.
    pub fn using_backup(&self) -> bool {
        self.active == EndpointRole::Backup
    }
}

/// The primary endpoint, the optional backup, and the state that selects
/// between them.
#[derive(Debug)]
pub struct EndpointSet {
    primary: Endpoint,
    backup: Option<Endpoint>,
    state: Arc<ConnectionState>,
}

impl EndpointSet {
    /// Creates a set with fresh state.
    pub fn new(primary: Arc<dyn SqlBackend>, backup: Option<Arc<dyn SqlBackend>>) -> Self {
        Self::with_state(primary, backup, Arc::new(ConnectionState::new()))
    }

    /// Creates a set over existing state.
    pub fn with_state(
        primary: Arc<dyn SqlBackend>,
        backup: Option<Arc<dyn SqlBackend>>,
        state: Arc<ConnectionState>,
    ) -> Self {
        Self {
            primary: Endpoint::new(EndpointRole::Primary, primary),
            backup: backup.map(|b| Endpoint::new(EndpointRole::Backup, b)),
            state,
        }
    }

    /// Builds both endpoints for the configured engine.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let primary = backends::connect(config.engine, &config.primary_endpoint())?;
        let backup = config
            .backup_endpoint()
            .map(|endpoint| backends::connect(config.engine, &endpoint))
            .transpose()?;
        Ok(Self::new(primary, backup))
    }

    pub fn primary(&self) -> &Endpoint {
        &self.primary
    }

    pub fn backup(&self) -> Option<&Endpoint> {
        self.backup.as_ref()
    }

    pub fn state(&self) -> &Arc<ConnectionState> {
        &self.state
    }

    pub fn kind(&self) -> BackendKind {
        self.primary.backend.kind()
    }

    /// The endpoint currently marked active.
    ///
    /// The primary until a probe says otherwise. Never touches the database.
    pub fn resolve_active_endpoint(&self) -> &Endpoint {
        match self.state.active_role() {
            EndpointRole::Backup => self.backup.as_ref().unwrap_or(&self.primary),
            EndpointRole::Primary => &self.primary,
        }
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        let mut endpoints = vec![self.primary.snapshot()];
        if let Some(backup) = &self.backup {
            endpoints.push(backup.snapshot());
        }
        ConnectionSnapshot {
            kind: self.kind(),
            active: self.state.active_role(),
            connected: self.state.is_connected(),
            probed: self.state.has_probed(),
            last_probe: self.state.last_probe_time(),
            endpoints,
        }
    }
}
