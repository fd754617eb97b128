//! The in-memory wire value enum.
//!
//! One variant per wire type. Integer width and string width are pure
//! functions of magnitude/length at encode time, so the enum only needs one
//! numeric-integer and one string variant rather than one per wire width.

use std::collections::BTreeMap;

/// A fully decoded struct payload: `field_id -> Value`. Duplicates within a
/// single struct are resolved "last wins" on insert.
pub type FieldBag = BTreeMap<u8, Value>;

/// Caller-supplied values for fields marked non-wire.
pub type ExtraMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Bytes(Vec<u8>),
    Map(Vec<(Value, Value)>),
    List(Vec<Value>),
    Struct(FieldBag),
}

impl Value {
    /// Name used in `TypeMismatch` diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Byte(_) => "byte",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float32",
            Value::Double(_) => "float64",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Map(_) => "map",
            Value::List(_) => "list",
            Value::Struct(_) => "struct",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Errors converting a decoded `Value` back into a host type used by
/// generated `Decodable::from_fields` bodies.
#[derive(Debug)]
pub struct WrongKind {
    pub expected: &'static str,
    pub actual: &'static str,
}

impl TryFrom<Value> for String {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(s),
            other => Err(WrongKind {
                expected: "string",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(i) => Ok(i),
            Value::Byte(b) => Ok(b as i64),
            other => Err(WrongKind {
                expected: "int",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for i8 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Byte(b) => Ok(b),
            Value::Int(i) => Ok(i as i8),
            other => Err(WrongKind {
                expected: "byte",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        i64::try_from(v).map(|i| i as i32)
    }
}

impl TryFrom<Value> for i16 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        i64::try_from(v).map(|i| i as i16)
    }
}

impl TryFrom<Value> for u8 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        i64::try_from(v).map(|i| i as u8)
    }
}

impl TryFrom<Value> for u16 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        i64::try_from(v).map(|i| i as u16)
    }
}

impl TryFrom<Value> for u32 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        i64::try_from(v).map(|i| i as u32)
    }
}

impl TryFrom<Value> for bool {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(b),
            Value::Byte(b) => Ok(b != 0),
            other => Err(WrongKind {
                expected: "bool",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Float(f) => Ok(f),
            other => Err(WrongKind {
                expected: "float32",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Double(d) => Ok(d),
            other => Err(WrongKind {
                expected: "float64",
                actual: other.kind_name(),
            }),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = WrongKind;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bytes(b) => Ok(b),
            other => Err(WrongKind {
                expected: "bytes",
                actual: other.kind_name(),
            }),
        }
    }
}
