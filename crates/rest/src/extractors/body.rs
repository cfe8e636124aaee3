//! Request body extractor.
//!
//! Bodies are read as loose JSON objects. A missing or empty body is an empty
//! object, so presence checks report the missing fields instead of the
//! request being rejected outright.
//!
//! Only JSON is accepted. Form-encoded bodies are not parsed and get `400`
//! with `请求体不是有效的JSON`, whatever the `Content-Type`.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use hytt_persistence::types::SqlValue;
use serde_json::{Map, Value};

use crate::error::{RestError, RestResult};

/// Axum extractor for a JSON object body.
///
/// # Example
///
/// ```rust,ignore
/// use hytt_rest::extractors::Fields;
///
/// async fn create_handler(fields: Fields) -> RestResult<()> {
///     fields.require(&["name", "phone"], "姓名和电话不能为空")?;
///     let name = fields.value("name");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Map<String, Value>);

impl Fields {
    /// Parses a request body. Blank input is an empty object.
    pub fn from_slice(bytes: &[u8]) -> RestResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(RestError::bad_request("请求体必须是JSON对象")),
            Err(_) => Err(RestError::bad_request("请求体不是有效的JSON")),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the key was sent at all, even as `null`.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Whether the key holds a truthy value: not missing, `null`, `false`,
    /// `0` or an empty string.
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// Fails with `message` unless every key is present.
    pub fn require(&self, keys: &[&str], message: &str) -> RestResult<()> {
        if keys.iter().all(|key| self.is_present(key)) {
            Ok(())
        } else {
            Err(RestError::bad_request(message))
        }
    }

    /// The field as a bind parameter. Missing keys bind `NULL`.
    pub fn value(&self, key: &str) -> SqlValue {
        self.get(key).map(to_sql_value).unwrap_or(SqlValue::Null)
    }

    /// The field as a bind parameter, or `default` when the key was not sent.
    pub fn value_or(&self, key: &str, default: impl Into<SqlValue>) -> SqlValue {
        match self.get(key) {
            Some(value) => to_sql_value(value),
            None => default.into(),
        }
    }

    /// The field as a bind parameter, or `default` when it is not truthy.
    pub fn truthy_or(&self, key: &str, default: impl Into<SqlValue>) -> SqlValue {
        match self.get(key) {
            Some(value) if is_truthy(value) => to_sql_value(value),
            _ => default.into(),
        }
    }

    /// The field as a string, if it is one.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<S> FromRequest<S> for Fields
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| RestError::bad_request(e.body_text()))?;
        Self::from_slice(&bytes)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Converts a JSON value into a bind parameter.
///
/// Arrays and objects are bound as their JSON text.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// A path segment as a bind parameter: an integer when it parses as one,
/// text otherwise. Text never matches an integer key, so lookups come back
/// empty instead of failing.
pub fn id_param(raw: &str) -> SqlValue {
    raw.parse::<i64>()
        .map(SqlValue::Integer)
        .unwrap_or_else(|_| SqlValue::Text(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => Fields(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_blank_body_is_empty() {
        assert_eq!(Fields::from_slice(b"").unwrap(), Fields::default());
        assert_eq!(Fields::from_slice(b"  \n").unwrap(), Fields::default());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Fields::from_slice(b"[1, 2]").is_err());
        assert!(Fields::from_slice(b"{not json").is_err());
    }

    #[test]
    fn test_form_body_is_invalid_json() {
        let err = Fields::from_slice(b"name=%E5%BC%A0&phone=138").unwrap_err();
        assert_eq!(err, RestError::bad_request("请求体不是有效的JSON"));
    }

    #[test]
    fn test_presence_follows_truthiness() {
        let f = fields(json!({
            "name": "Li",
            "empty": "",
            "zero": 0,
            "null": null,
            "no": false,
            "status": 0
        }));
        assert!(f.is_present("name"));
        assert!(!f.is_present("empty"));
        assert!(!f.is_present("zero"));
        assert!(!f.is_present("null"));
        assert!(!f.is_present("no"));
        assert!(!f.is_present("missing"));
        assert!(f.contains("status"));
        assert!(!f.contains("missing"));
    }

    #[test]
    fn test_require() {
        let f = fields(json!({"name": "Li", "phone": ""}));
        assert!(f.require(&["name"], "x").is_ok());
        assert_eq!(
            f.require(&["name", "phone"], "姓名和电话不能为空").unwrap_err(),
            RestError::bad_request("姓名和电话不能为空")
        );
    }

    #[test]
    fn test_values() {
        let f = fields(json!({"a": 3, "b": 1.5, "c": true, "d": "x", "e": null, "f": [1]}));
        assert_eq!(f.value("a"), SqlValue::Integer(3));
        assert_eq!(f.value("b"), SqlValue::Real(1.5));
        assert_eq!(f.value("c"), SqlValue::Integer(1));
        assert_eq!(f.value("d"), SqlValue::Text("x".to_string()));
        assert_eq!(f.value("e"), SqlValue::Null);
        assert_eq!(f.value("f"), SqlValue::Text("[1]".to_string()));
        assert_eq!(f.value("missing"), SqlValue::Null);
    }

    #[test]
    fn test_defaults() {
        let f = fields(json!({"sort_order": 0, "status": 0}));
        assert_eq!(f.truthy_or("sort_order", 5), SqlValue::Integer(5));
        assert_eq!(f.value_or("status", 1), SqlValue::Integer(0));
        assert_eq!(f.value_or("is_important", 0), SqlValue::Integer(0));
    }

    #[test]
    fn test_id_param() {
        assert_eq!(id_param("42"), SqlValue::Integer(42));
        assert_eq!(id_param("abc"), SqlValue::Text("abc".to_string()));
    }
}
