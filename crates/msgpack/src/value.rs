//! [`Value`]: the canonical in-memory form of one MessagePack value.

use std::fmt;

use crate::constants::{NEGFIXINT_PREFIX, NEVER_USED, POSFIXINT_MAX, TIMESTAMP_EXT_TYPE};
use crate::{MsgPackError, Timestamp};

/// The physical kind of a wire value, as reported by
/// [`Unpacker::peek_kind`](crate::Unpacker::peek_kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Ext,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::Bin => "bin",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Ext => "ext",
        }
    }

    /// Classifies a MessagePack format byte.
    ///
    /// Returns `None` for the never-used byte `0xc1`.
    pub fn from_format(byte: u8) -> Option<ValueKind> {
        let kind = match byte {
            0x00..=POSFIXINT_MAX | NEGFIXINT_PREFIX..=u8::MAX | 0xcc..=0xd3 => ValueKind::Int,
            0x80..=0x8f | 0xde | 0xdf => ValueKind::Map,
            0x90..=0x9f | 0xdc | 0xdd => ValueKind::Array,
            0xa0..=0xbf | 0xd9..=0xdb => ValueKind::Str,
            0xc0 => ValueKind::Nil,
            NEVER_USED => return None,
            0xc2 | 0xc3 => ValueKind::Bool,
            0xc4..=0xc6 => ValueKind::Bin,
            0xc7..=0xc9 | 0xd4..=0xd8 => ValueKind::Ext,
            0xca | 0xcb => ValueKind::Float,
        };
        Some(kind)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A MessagePack extension: application-defined type id plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtValue {
    pub type_id: i8,
    pub data: Vec<u8>,
}

impl ExtValue {
    pub fn new(type_id: i8, data: Vec<u8>) -> Self {
        Self { type_id, data }
    }

    pub fn is_timestamp(&self) -> bool {
        self.type_id == TIMESTAMP_EXT_TYPE
    }

    /// Decodes the payload as a [`Timestamp`] if this is a timestamp extension.
    pub fn timestamp(&self) -> Option<Result<Timestamp, MsgPackError>> {
        self.is_timestamp()
            .then(|| Timestamp::from_ext_payload(&self.data))
    }
}

/// One MessagePack value.
///
/// Map entries keep their insertion (or decode) order and duplicate keys are
/// kept as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    /// Only for integers above `i64::MAX`; smaller ones are always `Int`.
    UInt(u64),
    Float(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Ext(ExtValue),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) | Value::UInt(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bin(_) => ValueKind::Bin,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Ext(_) => ValueKind::Ext,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up the first map entry whose key is the string `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn timestamp(ts: Timestamp) -> Value {
        Value::Ext(ExtValue::new(TIMESTAMP_EXT_TYPE, ts.to_ext_payload()))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i64)
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(int) => Value::Int(int),
            Err(_) => Value::UInt(v),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bin(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::timestamp(v)
    }
}

impl From<ExtValue> for Value {
    fn from(v: ExtValue) -> Self {
        Value::Ext(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}
