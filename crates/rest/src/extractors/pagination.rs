//! Pagination extractors.
//!
//! Query values are read leniently: a leading integer is taken from the
//! text, and anything that does not yield a positive number falls back to
//! the default.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::error::RestError;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_LATEST_LIMIT: i64 = 5;

/// Axum extractor for `page` and `pageSize`.
///
/// # Example
///
/// ```rust,ignore
/// use hytt_rest::extractors::Pagination;
///
/// async fn list_handler(pagination: Pagination) {
///     let limit = pagination.page_size();
///     let offset = pagination.offset();
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    page_size: i64,
}

#[derive(Debug, Deserialize)]
struct PaginationQuery {
    page: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

impl Pagination {
    /// Creates a Pagination, replacing non-positive values with defaults.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: if page > 0 { page } else { DEFAULT_PAGE },
            page_size: if page_size > 0 {
                page_size
            } else {
                DEFAULT_PAGE_SIZE
            },
        }
    }

    /// Returns the page number, starting at 1.
    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Rows to skip before this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PaginationQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| RestError::bad_request("分页参数无效"))?;

        Ok(Pagination::new(
            query.page.as_deref().and_then(parse_int).unwrap_or(0),
            query.page_size.as_deref().and_then(parse_int).unwrap_or(0),
        ))
    }
}

/// Axum extractor for the `limit` and `force` parameters of the latest
/// notices listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestQuery {
    pub limit: i64,
    /// `force=true` was given.
    pub force: bool,
}

#[derive(Debug, Deserialize)]
struct LatestParams {
    limit: Option<String>,
    force: Option<String>,
}

impl Default for LatestQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LATEST_LIMIT,
            force: false,
        }
    }
}

impl<S> FromRequestParts<S> for LatestQuery
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<LatestParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| RestError::bad_request("查询参数无效"))?;

        Ok(LatestQuery {
            limit: params
                .limit
                .as_deref()
                .and_then(parse_int)
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_LATEST_LIMIT),
            force: params.force.as_deref() == Some("true"),
        })
    }
}

/// Parses the leading integer of `s`, ignoring surrounding whitespace and
/// trailing garbage: `"12abc"` is 12, `"abc"` is `None`.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
