//! Statement results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationResult {
    /// Rows inserted, updated or deleted.
    #[serde(rename = "affectedRows")]
    pub affected_rows: u64,
    /// Generated id of the last inserted row, or `0`.
    #[serde(rename = "insertId")]
    pub insert_id: i64,
}

impl MutationResult {
    /// Creates a mutation result.
    pub fn new(affected_rows: u64, insert_id: i64) -> Self {
        Self {
            affected_rows,
            insert_id,
        }
    }

    /// The `{affectedRows: 0, insertId: 0}` result returned on failure.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Returns true if at least one row was touched.
    pub fn changed(&self) -> bool {
        self.affected_rows > 0
    }
}

/// Whether a statement reads rows or mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Mutation,
}

impl StatementKind {
    /// A statement is a read when its trimmed text starts with `select`,
    /// compared case-insensitively.
    pub fn classify(sql: &str) -> Self {
        let trimmed = sql.trim_start().as_bytes();
        if trimmed.len() >= 6 && trimmed[..6].eq_ignore_ascii_case(b"select") {
            StatementKind::Select
        } else {
            StatementKind::Mutation
        }
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Rows(Vec<Row>),
    Mutation(MutationResult),
}

impl QueryResult {
    /// The neutral value for `sql`: no rows for reads, a zero mutation for
    /// everything else.
    pub fn neutral_for(sql: &str) -> Self {
        match StatementKind::classify(sql) {
            StatementKind::Select => QueryResult::Rows(Vec::new()),
            StatementKind::Mutation => QueryResult::Mutation(MutationResult::neutral()),
        }
    }

    /// Returns true for a neutral result.
    pub fn is_neutral(&self) -> bool {
        match self {
            QueryResult::Rows(rows) => rows.is_empty(),
            QueryResult::Mutation(m) => *m == MutationResult::neutral(),
        }
    }

    /// Borrowed rows; empty for a mutation.
    pub fn rows(&self) -> &[Row] {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Mutation(_) => &[],
        }
    }

    /// Owned rows; empty for a mutation.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Mutation(_) => Vec::new(),
        }
    }

    /// The mutation outcome; neutral for a row set.
    pub fn mutation(&self) -> MutationResult {
        match self {
            QueryResult::Mutation(m) => *m,
            QueryResult::Rows(_) => MutationResult::neutral(),
        }
    }

    /// The first row, if any.
    pub fn first_row(self) -> Option<Row> {
        self.into_rows().into_iter().next()
    }
}
