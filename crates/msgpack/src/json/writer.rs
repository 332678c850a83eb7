//! JSON text rendering of [`Value`]s and of raw MessagePack bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::constants::UINT64;
use crate::{ExtValue, MsgPackError, Timestamp, Unpacker, Value, ValueKind};

/// JSON rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonOptions {
    /// Render NaN and infinities as the strings `"NaN"`, `"Infinity"` and
    /// `"-Infinity"` instead of `null`.
    pub non_finite_as_string: bool,
}

impl JsonOptions {
    pub fn with_non_finite_as_string(mut self, enabled: bool) -> Self {
        self.non_finite_as_string = enabled;
        self
    }
}

/// Renders a [`Value`] as compact JSON text.
pub fn to_json(value: &Value) -> String {
    to_json_with(value, JsonOptions::default())
}

pub fn to_json_with(value: &Value, options: JsonOptions) -> String {
    let mut writer = JsonWriter::new(options);
    writer.write_value(value);
    writer.finish()
}

/// Renders MessagePack bytes as JSON text without building a [`Value`].
pub fn msgpack_to_json(bytes: &[u8]) -> Result<String, MsgPackError> {
    msgpack_to_json_with(&mut Unpacker::new(bytes), JsonOptions::default())
}

/// Renders the next value of `unpacker` as JSON text.
pub fn msgpack_to_json_with(
    unpacker: &mut Unpacker<'_>,
    options: JsonOptions,
) -> Result<String, MsgPackError> {
    let mut writer = JsonWriter::new(options);
    writer.write_from(unpacker)?;
    Ok(writer.finish())
}

/// Streaming JSON text builder.
#[derive(Debug, Default)]
pub struct JsonWriter {
    out: String,
    options: JsonOptions,
}

impl JsonWriter {
    pub fn new(options: JsonOptions) -> Self {
        Self {
            out: String::new(),
            options,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn write_null(&mut self) {
        self.out.push_str("null");
    }

    pub fn write_bool(&mut self, b: bool) {
        self.out.push_str(if b { "true" } else { "false" });
    }

    pub fn write_i64(&mut self, int: i64) {
        self.out.push_str(&int.to_string());
    }

    pub fn write_u64(&mut self, uint: u64) {
        self.out.push_str(&uint.to_string());
    }

    /// Finite floats always carry a fraction or an exponent, so they parse
    /// back as floats.
    pub fn write_f64(&mut self, float: f64) {
        match serde_json::Number::from_f64(float) {
            Some(num) => self.out.push_str(&num.to_string()),
            None if self.options.non_finite_as_string => {
                let text = if float.is_nan() {
                    "NaN"
                } else if float > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                self.write_str(text);
            }
            None => self.write_null(),
        }
    }

    pub fn write_str(&mut self, s: &str) {
        let out = &mut self.out;
        out.reserve(s.len() + 2);
        out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{0008}' => out.push_str("\\b"),
                '\u{000c}' => out.push_str("\\f"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
    }

    /// Binary has no JSON form; it is rendered as lossy UTF-8 text.
    pub fn write_bin(&mut self, bytes: &[u8]) {
        self.write_str(&String::from_utf8_lossy(bytes));
    }

    pub fn write_ext(&mut self, ext: &ExtValue) {
        match ext.timestamp() {
            Some(Ok(ts)) => self.write_timestamp(&ts),
            _ => {
                self.out.push('[');
                self.write_i64(ext.type_id as i64);
                self.out.push(',');
                self.write_str(&STANDARD.encode(&ext.data));
                self.out.push(']');
            }
        }
    }

    pub fn write_timestamp(&mut self, ts: &Timestamp) {
        self.write_str(&ts.to_rfc3339());
    }

    /// Object keys must be strings; any other key is rendered to JSON text
    /// first and that text becomes the key.
    fn write_key(&mut self, key: &Value) {
        match key {
            Value::Str(s) => self.write_str(s),
            other => {
                let text = to_json_with(other, self.options);
                self.write_str(&text);
            }
        }
    }

    pub fn write_value(&mut self, value: &Value) {
        match value {
            Value::Nil => self.write_null(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Int(i) => self.write_i64(*i),
            Value::UInt(u) => self.write_u64(*u),
            Value::Float(f) => self.write_f64(*f),
            Value::Str(s) => self.write_str(s),
            Value::Bin(b) => self.write_bin(b),
            Value::Array(items) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.write_value(item);
                }
                self.out.push(']');
            }
            Value::Map(entries) => {
                self.out.push('{');
                for (i, (key, val)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.write_key(key);
                    self.out.push(':');
                    self.write_value(val);
                }
                self.out.push('}');
            }
            Value::Ext(ext) => self.write_ext(ext),
        }
    }

    /// Renders the next value of `u`, consuming it.
    pub fn write_from(&mut self, u: &mut Unpacker<'_>) -> Result<(), MsgPackError> {
        match u.peek_kind()? {
            ValueKind::Nil => {
                u.unpack_nil()?;
                self.write_null();
            }
            ValueKind::Bool => self.write_bool(u.unpack_bool()?),
            ValueKind::Int if u.peek_format()? == UINT64 => self.write_u64(u.unpack_u64()?),
            ValueKind::Int => self.write_i64(u.unpack_i64()?),
            ValueKind::Float => self.write_f64(u.unpack_f64()?),
            ValueKind::Str => {
                let s = u.unpack_str()?;
                self.write_str(&s);
            }
            ValueKind::Bin => self.write_bin(u.unpack_bin()?),
            ValueKind::Array => u.nested(|u| {
                let len = u.unpack_array_header()?;
                self.out.push('[');
                for i in 0..len {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.write_from(u)?;
                }
                self.out.push(']');
                Ok::<_, MsgPackError>(())
            })?,
            ValueKind::Map => u.nested(|u| {
                let len = u.unpack_map_header()?;
                self.out.push('{');
                for i in 0..len {
                    if i > 0 {
                        self.out.push(',');
                    }
                    if u.peek_kind()? == ValueKind::Str {
                        let key = u.unpack_str()?;
                        self.write_str(&key);
                    } else {
                        let mut key = JsonWriter::new(self.options);
                        key.write_from(u)?;
                        self.write_str(&key.finish());
                    }
                    self.out.push(':');
                    self.write_from(u)?;
                }
                self.out.push('}');
                Ok::<_, MsgPackError>(())
            })?,
            ValueKind::Ext => self.write_ext(&u.unpack_ext()?),
        }
        Ok(())
    }
}
