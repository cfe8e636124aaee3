//! Placeholder scanning and rewriting for `?`-style SQL templates.
//!
//! Markers inside single- or double-quoted literals are not placeholders.
//! A doubled quote inside a literal (`'it''s'`) closes and reopens it.

use crate::types::SqlValue;

/// Byte offsets of every `?` placeholder in `sql`.
pub fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<u8> = None;

    for (i, b) in sql.bytes().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'?' => positions.push(i),
                _ => {}
            },
        }
    }

    positions
}

/// Returns true if `sql` contains at least one placeholder.
pub fn has_placeholder(sql: &str) -> bool {
    !placeholder_positions(sql).is_empty()
}

/// Number of placeholders in `sql`.
pub fn placeholder_count(sql: &str) -> usize {
    placeholder_positions(sql).len()
}

/// Renders a value as a SQL literal.
fn literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) if f.is_finite() => f.to_string(),
        SqlValue::Real(_) => "NULL".to_string(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Substitutes each parameter into its placeholder as a literal.
///
/// Numbers are written unquoted, text is single-quoted with embedded quotes
/// doubled. Returns `None` when the parameter count does not match the
/// placeholder count.
pub fn inline_parameters(sql: &str, params: &[SqlValue]) -> Option<String> {
    let positions = placeholder_positions(sql);
    if positions.len() != params.len() {
        return None;
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut last = 0;
    for (pos, value) in positions.iter().zip(params) {
        out.push_str(&sql[last..*pos]);
        out.push_str(&literal(value));
        last = pos + 1;
    }
    out.push_str(&sql[last..]);
    Some(out)
}

/// Rewrites `?` placeholders to `$1..$n`.
pub fn number_placeholders(sql: &str) -> String {
    let positions = placeholder_positions(sql);
    if positions.is_empty() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + positions.len() * 2);
    let mut last = 0;
    for (n, pos) in positions.iter().enumerate() {
        out.push_str(&sql[last..*pos]);
        out.push('$');
        out.push_str(&(n + 1).to_string());
        last = pos + 1;
    }
    out.push_str(&sql[last..]);
    out
}
