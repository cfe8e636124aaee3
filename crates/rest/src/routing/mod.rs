//! Route configuration for the booking REST API.
//!
//! This module maps HTTP paths to handlers.

pub mod api_routes;

pub use api_routes::create_routes;
