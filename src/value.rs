//! Parameter values and typed parameter descriptors.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width given to an unsized string type when the value fits in it.
pub const DEFAULT_STRING_WIDTH: u32 = 4000;

/// A captured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Json(serde_json::Value),
    /// Sequence value, bound as one list parameter.
    Array(Vec<Value>),
    /// Value wrapped with an explicit database type.
    Typed(Box<TypedValue>),
}

impl Value {
    /// Sequence-valued parameters are referenced with the array suffix.
    pub fn is_sequence(&self) -> bool {
        match self {
            Value::Array(_) => true,
            Value::Typed(t) => t.value.is_sequence(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Unquoted text for values written straight into the query text.
    pub fn raw_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => ts.to_string(),
            Value::Date(d) => d.to_string(),
            Value::Json(j) => j.to_string(),
            Value::Array(items) => items
                .iter()
                .map(Value::raw_text)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Typed(t) => t.value.raw_text(),
            other => other.to_string(),
        }
    }

    /// Convert loose JSON into a value. Objects stay JSON documents.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Uuid(u) => write!(f, "'{}'", u),
            Value::Timestamp(ts) => write!(f, "'{}'", ts),
            Value::Date(d) => write!(f, "'{}'", d),
            Value::Json(json) => write!(f, "'{}'", json.to_string().replace('\'', "''")),
            Value::Array(arr) => {
                write!(f, "(")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::Typed(t) => write!(f, "{}", t.value),
        }
    }
}

/// Explicit width of a string parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    Chars(u32),
    /// `(max)` and the unbounded `text` types.
    Max,
}

/// Database type names recognized in annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbType {
    /// varchar
    AnsiString,
    /// nvarchar
    String,
    /// char
    AnsiStringFixedLength,
    /// nchar
    StringFixedLength,
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Currency,
    Single,
    Double,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Guid,
    Binary,
    Xml,
    Json,
}

impl DbType {
    /// Look up a non-string type name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "bit" | "bool" | "boolean" => DbType::Boolean,
            "tinyint" => DbType::Byte,
            "smallint" => DbType::Int16,
            "int" | "integer" => DbType::Int32,
            "bigint" => DbType::Int64,
            "decimal" | "numeric" => DbType::Decimal,
            "money" => DbType::Currency,
            "real" => DbType::Single,
            "float" | "double" => DbType::Double,
            "date" => DbType::Date,
            "time" => DbType::Time,
            "datetime" => DbType::DateTime,
            "datetime2" => DbType::DateTime2,
            "datetimeoffset" => DbType::DateTimeOffset,
            "uniqueidentifier" | "uuid" | "guid" => DbType::Guid,
            "binary" | "varbinary" => DbType::Binary,
            "xml" => DbType::Xml,
            "json" => DbType::Json,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DbType::AnsiString
                | DbType::String
                | DbType::AnsiStringFixedLength
                | DbType::StringFixedLength
        )
    }
}

/// A value carrying an explicit database type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub value: Value,
    pub db_type: DbType,
    pub width: Option<Width>,
}

impl TypedValue {
    pub fn new(value: Value, db_type: DbType, width: Option<Width>) -> Self {
        Self {
            value,
            db_type,
            width,
        }
    }

    /// Single-byte encoding (varchar/char) rather than unicode.
    pub fn is_ansi(&self) -> bool {
        matches!(
            self.db_type,
            DbType::AnsiString | DbType::AnsiStringFixedLength
        )
    }

    pub fn is_fixed_length(&self) -> bool {
        matches!(
            self.db_type,
            DbType::AnsiStringFixedLength | DbType::StringFixedLength
        )
    }
}

impl From<TypedValue> for Value {
    fn from(t: TypedValue) -> Self {
        Value::Typed(Box::new(t))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int(n as i64)
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

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
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

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
