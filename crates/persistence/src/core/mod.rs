//! Core storage traits.
//!
//! - [`SqlBackend`] - one pooled database endpoint
//! - [`SqlConnection`] - a connection checked out of that pool

mod backend;

pub use backend::{BackendKind, PoolStats, SqlBackend, SqlConnection};
