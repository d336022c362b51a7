use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value bound to a statement parameter or inlined as a SQL literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Binary data (bytea / varbinary)
    Bytes(Vec<u8>),
    /// A captured collection, used by IN predicates.
    List(Vec<Value>),
    /// A captured object whose fields are read by member-access chains.
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Render as a SQL literal with single quotes doubled. Booleans are
    /// dialect-dependent and handled by the dialect generator instead.
    pub fn sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Uuid(u) => format!("'{}'", u),
            Value::Timestamp(ts) => format!("'{}'", ts.to_rfc3339()),
            Value::Bytes(bytes) => {
                let mut out = String::from("x'");
                for byte in bytes {
                    out.push_str(&format!("{:02x}", byte));
                }
                out.push('\'');
                out
            }
            Value::List(vals) => {
                let parts: Vec<String> = vals.iter().map(|v| v.sql_literal()).collect();
                format!("({})", parts.join(", "))
            }
            Value::Record(_) => "<record>".to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::List(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vals: Vec<Value>) -> Self {
        Value::List(vals)
    }
}

impl From<Vec<i64>> for Value {
    fn from(vals: Vec<i64>) -> Self {
        Value::List(vals.into_iter().map(Value::Int).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(vals: Vec<i32>) -> Self {
        Value::List(vals.into_iter().map(|n| Value::Int(n as i64)).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(vals: Vec<String>) -> Self {
        Value::List(vals.into_iter().map(Value::String).collect())
    }
}

impl<'a> From<Vec<&'a str>> for Value {
    fn from(vals: Vec<&'a str>) -> Self {
        Value::List(vals.into_iter().map(Value::from).collect())
    }
}

impl From<Option<String>> for Value {
    fn from(opt: Option<String>) -> Self {
        match opt {
            Some(s) => Value::String(s),
            None => Value::Null,
        }
    }
}

impl<'a> From<Option<&'a str>> for Value {
    fn from(opt: Option<&'a str>) -> Self {
        match opt {
            Some(s) => Value::String(s.to_string()),
            None => Value::Null,
        }
    }
}

impl From<Option<i64>> for Value {
    fn from(opt: Option<i64>) -> Self {
        match opt {
            Some(n) => Value::Int(n),
            None => Value::Null,
        }
    }
}

impl From<Option<i32>> for Value {
    fn from(opt: Option<i32>) -> Self {
        match opt {
            Some(n) => Value::Int(n as i64),
            None => Value::Null,
        }
    }
}

impl From<Option<bool>> for Value {
    fn from(opt: Option<bool>) -> Self {
        match opt {
            Some(b) => Value::Bool(b),
            None => Value::Null,
        }
    }
}

impl From<Option<Uuid>> for Value {
    fn from(opt: Option<Uuid>) -> Self {
        match opt {
            Some(u) => Value::Uuid(u),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes_quotes() {
        let v = Value::from("O'Brien");
        assert_eq!(v.sql_literal(), "'O''Brien'");
    }

    #[test]
    fn test_list_literal() {
        let v = Value::from(vec![1i64, 2, 3]);
        assert_eq!(v.sql_literal(), "(1, 2, 3)");
    }

    #[test]
    fn test_option_conversions() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }
}
