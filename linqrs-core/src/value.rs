//! Operand values written into condition fragments

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A comparison operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Textual value, quoted and case-folded by the condition compiler
    String(String),
    /// Timestamp, written as a quoted ISO-8601 literal
    DateTime(DateTime<Utc>),
    #[cfg(feature = "uuid-support")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "decimal-support")]
    Decimal(rust_decimal::Decimal),
}

impl Value {
    /// Whether the operand is text subject to quoting and case-folding
    pub fn is_text(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Render the operand as it appears in a condition fragment.
    ///
    /// Text is returned as-is; quoting is decided by the caller.
    pub fn render(&self) -> String {
        match self {
            Value::Null => crate::operator::keyword::NULL.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::I32(i) => i.to_string(),
            Value::I64(i) => i.to_string(),
            Value::F32(f) => f.to_string(),
            Value::F64(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTime(dt) => quote(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            #[cfg(feature = "uuid-support")]
            Value::Uuid(id) => quote(&id.to_string()),
            #[cfg(feature = "decimal-support")]
            Value::Decimal(d) => d.to_string(),
        }
    }

    /// Render the operand as a member of an `IN (...)` list
    pub fn render_list_member(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            other => other.render(),
        }
    }
}

/// Wrap text in single quotes, doubling any embedded single quote
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

// Implement From for common types
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::I32(val)
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Self {
        Value::I64(val)
    }
}

impl From<u32> for Value {
    fn from(val: u32) -> Self {
        Value::I64(val as i64)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::F32(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::F64(val)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(val: DateTime<Utc>) -> Self {
        Value::DateTime(val)
    }
}

#[cfg(feature = "uuid-support")]
impl From<uuid::Uuid> for Value {
    fn from(val: uuid::Uuid) -> Self {
        Value::Uuid(val)
    }
}

#[cfg(feature = "decimal-support")]
impl From<rust_decimal::Decimal> for Value {
    fn from(val: rust_decimal::Decimal) -> Self {
        Value::Decimal(val)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_value_creation() {
        assert_eq!(Value::from(42i32), Value::I32(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(()), Value::Null);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(Some(42i32)), Value::I32(42));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Bool(false).render(), "false");
        assert_eq!(Value::I64(-7).render(), "-7");
        assert_eq!(Value::F64(2.5).render(), "2.5");
        assert_eq!(Value::from("O'Brien").render(), "O'Brien");
        assert_eq!(Value::Null.render(), "NULL");
    }

    #[test]
    fn test_datetime_renders_quoted_iso() {
        let dt = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::from(dt).render(), "'2020-01-02T03:04:05.000Z'");
    }

    #[test]
    fn test_quote_doubles_single_quotes() {
        assert_eq!(quote("O'Brien"), "'O''Brien'");
        assert_eq!(quote("plain"), "'plain'");
    }

    #[test]
    fn test_list_member_rendering() {
        assert_eq!(Value::from("a'b").render_list_member(), "'a''b'");
        assert_eq!(Value::I32(3).render_list_member(), "3");
    }

    #[test]
    fn test_text_detection() {
        assert!(Value::from("x").is_text());
        assert!(!Value::Bool(true).is_text());
    }
}
