//! Scalar values bound to SQL statements.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A single bind parameter.
///
/// Route handlers build these from typed request fields; JSON scalars
/// deserialize directly into the matching variant (booleans become `0`/`1`).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    /// SQL `NULL`.
    #[default]
    Null,
    /// A signed 64-bit integer.
    Integer(i64),
    /// A double precision float.
    Real(f64),
    /// A text value.
    Text(String),
}

impl SqlValue {
    /// Returns true for `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Truthiness as the mini-program clients understand it: `NULL`, zero,
    /// and the empty string count as "not provided".
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Integer(i) => *i != 0,
            SqlValue::Real(f) => *f != 0.0 && !f.is_nan(),
            SqlValue::Text(s) => !s.is_empty(),
        }
    }

    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Converts the value into its JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::from(*i),
            SqlValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Digit-only text becomes an integer; anything else is returned as is.
    ///
    /// Text that overflows `i64` stays text.
    pub fn coerce_numeric(self) -> Self {
        match self {
            SqlValue::Text(s) if is_digit_string(&s) => match s.parse::<i64>() {
                Ok(i) => SqlValue::Integer(i),
                Err(_) => SqlValue::Text(s),
            },
            other => other,
        }
    }
}

fn is_digit_string(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Applies [`SqlValue::coerce_numeric`] to every parameter.
pub fn coerce_numeric_strings(params: Vec<SqlValue>) -> Vec<SqlValue> {
    params.into_iter().map(SqlValue::coerce_numeric).collect()
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Real(v as f64))
    }
}

impl From<usize> for SqlValue {
    fn from(v: usize) -> Self {
        SqlValue::from(v as u64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Integer(i) => serializer.serialize_i64(*i),
            SqlValue::Real(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct SqlValueVisitor;

impl<'de> Visitor<'de> for SqlValueVisitor {
    type Value = SqlValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON scalar (null, boolean, number or string)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<SqlValue, E> {
        Ok(SqlValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<SqlValue, E> {
        Ok(SqlValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<SqlValue, D::Error> {
        deserializer.deserialize_any(SqlValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<SqlValue, E> {
        Ok(SqlValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SqlValue, E> {
        Ok(SqlValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SqlValue, E> {
        Ok(SqlValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<SqlValue, E> {
        Ok(SqlValue::Real(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SqlValue, E> {
        Ok(SqlValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<SqlValue, E> {
        Ok(SqlValue::Text(v))
    }
}

impl<'de> Deserialize<'de> for SqlValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SqlValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digit_string_becomes_integer() {
        assert_eq!(
            SqlValue::from("42").coerce_numeric(),
            SqlValue::Integer(42)
        );
    }

    #[test]
    fn test_mixed_string_left_alone() {
        assert_eq!(
            SqlValue::from("42a").coerce_numeric(),
            SqlValue::Text("42a".to_string())
        );
        assert_eq!(
            SqlValue::from("-42").coerce_numeric(),
            SqlValue::Text("-42".to_string())
        );
        assert_eq!(
            SqlValue::from("").coerce_numeric(),
            SqlValue::Text(String::new())
        );
    }

    #[test]
    fn test_overflowing_digits_stay_text() {
        let huge = "99999999999999999999999";
        assert_eq!(
            SqlValue::from(huge).coerce_numeric(),
            SqlValue::Text(huge.to_string())
        );
    }

    #[test]
    fn test_coerce_list_preserves_order() {
        let params = vec![
            SqlValue::from("7"),
            SqlValue::Null,
            SqlValue::from("abc"),
            SqlValue::Real(1.5),
        ];
        assert_eq!(
            coerce_numeric_strings(params),
            vec![
                SqlValue::Integer(7),
                SqlValue::Null,
                SqlValue::Text("abc".to_string()),
                SqlValue::Real(1.5),
            ]
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!SqlValue::Null.is_truthy());
        assert!(!SqlValue::Integer(0).is_truthy());
        assert!(!SqlValue::from("").is_truthy());
        assert!(SqlValue::from("0").is_truthy());
        assert!(SqlValue::Integer(3).is_truthy());
    }

    #[test]
    fn test_deserialize_json_scalars() {
        let values: Vec<SqlValue> =
            serde_json::from_value(json!([null, true, 12, 2.5, "Li"])).unwrap();
        assert_eq!(
            values,
            vec![
                SqlValue::Null,
                SqlValue::Integer(1),
                SqlValue::Integer(12),
                SqlValue::Real(2.5),
                SqlValue::Text("Li".to_string()),
            ]
        );
    }

    #[test]
    fn test_deserialize_rejects_objects() {
        let result: Result<SqlValue, _> = serde_json::from_value(json!({"a": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<String> = None;
        assert_eq!(SqlValue::from(none), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(5i64)), SqlValue::Integer(5));
    }
}
