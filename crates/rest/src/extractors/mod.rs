//! Axum extractors for request bodies and query parameters.
//!
//! - [`Fields`] - Loose JSON object body with presence checks
//! - [`Pagination`] - `page` / `pageSize` query parameters
//! - [`LatestQuery`] - `limit` / `force` query parameters

mod body;
mod pagination;

pub use body::{Fields, id_param, to_sql_value};
pub use pagination::{LatestQuery, Pagination, parse_int};
