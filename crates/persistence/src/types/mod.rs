//! Core types for the persistence layer.
//!
//! - [`SqlValue`] - a scalar bind parameter
//! - [`Row`], [`QueryResult`], [`MutationResult`] - statement results
//! - [`StatementKind`] - read/write classification used for neutral results
//!
//! # Examples
//!
//! ```
//! use hytt_persistence::types::{coerce_numeric_strings, QueryResult, SqlValue};
//!
//! let params = coerce_numeric_strings(vec![SqlValue::from("42"), SqlValue::from("42a")]);
//! assert_eq!(params[0], SqlValue::Integer(42));
//! assert_eq!(params[1], SqlValue::from("42a"));
//!
//! let neutral = QueryResult::neutral_for("UPDATE users SET name = ? WHERE id = ?");
//! assert_eq!(neutral.mutation().affected_rows, 0);
//! ```

mod result;
mod value;

pub use result::{MutationResult, QueryResult, Row, StatementKind};
pub use value::{SqlValue, coerce_numeric_strings};
