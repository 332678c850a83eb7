//! `Unpacker`: cursor-based MessagePack decoder.

use std::borrow::Cow;

use weaver_buffers::Reader;

use crate::constants::*;
use crate::{ExtValue, MsgPackError, Timestamp, Value, ValueKind};

/// Deepest array/map nesting a decoder descends into.
pub const MAX_DEPTH: usize = 512;

/// Cursor over an immutable MessagePack buffer.
///
/// Typed reads check the next physical kind first; on a mismatch they fail
/// with [`MsgPackError::TypeMismatch`] without consuming anything. Nested
/// structures decode by recursion through [`Unpacker::nested`], which caps
/// the depth at [`MAX_DEPTH`].
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    reader: Reader<'a>,
    strict_utf8: bool,
    depth: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(data),
            strict_utf8: true,
            depth: 0,
        }
    }

    /// With `strict == false`, invalid UTF-8 in strings is replaced instead
    /// of failing with [`MsgPackError::InvalidString`].
    pub fn with_strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.reader.x
    }

    pub fn has_next(&self) -> bool {
        !self.reader.is_empty()
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.reader.size()
    }

    /// Runs `f` one nesting level deeper.
    ///
    /// Fails with [`MsgPackError::DepthExceeded`] once [`MAX_DEPTH`] levels
    /// are open. Every decoder that reads children of an array or map should
    /// do so inside this.
    pub fn nested<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<MsgPackError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(MsgPackError::DepthExceeded {
                offset: self.offset(),
            }
            .into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Returns the next format byte without consuming it.
    pub fn peek_format(&self) -> Result<u8, MsgPackError> {
        Ok(self.reader.peek()?)
    }

    /// Returns the kind of the next value without consuming it.
    pub fn peek_kind(&self) -> Result<ValueKind, MsgPackError> {
        let byte = self.peek_format()?;
        ValueKind::from_format(byte).ok_or(MsgPackError::ReservedByte {
            offset: self.offset(),
        })
    }

    fn expect_kind(&self, expected: ValueKind) -> Result<u8, MsgPackError> {
        let actual = self.peek_kind()?;
        if actual != expected {
            return Err(MsgPackError::TypeMismatch { expected, actual });
        }
        self.peek_format()
    }

    pub fn unpack_nil(&mut self) -> Result<(), MsgPackError> {
        self.expect_kind(ValueKind::Nil)?;
        self.reader.skip(1)?;
        Ok(())
    }

    /// Consumes a nil if one is next; returns whether it did.
    pub fn try_unpack_nil(&mut self) -> Result<bool, MsgPackError> {
        if self.peek_format()? == NIL {
            self.reader.skip(1)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn unpack_bool(&mut self) -> Result<bool, MsgPackError> {
        let format = self.expect_kind(ValueKind::Bool)?;
        self.reader.skip(1)?;
        Ok(format == TRUE)
    }

    fn unpack_integer(&mut self) -> Result<i128, MsgPackError> {
        let start = self.offset();
        let format = self.expect_kind(ValueKind::Int)?;
        let result = self.read_integer_body(format);
        if result.is_err() {
            self.reader.x = start;
        }
        result
    }

    fn read_integer_body(&mut self, format: u8) -> Result<i128, MsgPackError> {
        let r = &mut self.reader;
        r.skip(1)?;
        let int = match format {
            0x00..=POSFIXINT_MAX => format as i128,
            NEGFIXINT_PREFIX..=u8::MAX => format as i8 as i128,
            UINT8 => r.u8()? as i128,
            UINT16 => r.u16()? as i128,
            UINT32 => r.u32()? as i128,
            UINT64 => r.u64()? as i128,
            INT8 => r.i8()? as i128,
            INT16 => r.i16()? as i128,
            INT32 => r.i32()? as i128,
            _ => r.i64()? as i128,
        };
        Ok(int)
    }

    pub fn unpack_i64(&mut self) -> Result<i64, MsgPackError> {
        let start = self.offset();
        let int = self.unpack_integer()?;
        i64::try_from(int).map_err(|_| {
            self.reader.x = start;
            MsgPackError::IntegerOverflow {
                value: int,
                target: "i64",
            }
        })
    }

    pub fn unpack_u64(&mut self) -> Result<u64, MsgPackError> {
        let start = self.offset();
        let int = self.unpack_integer()?;
        u64::try_from(int).map_err(|_| {
            self.reader.x = start;
            MsgPackError::IntegerOverflow {
                value: int,
                target: "u64",
            }
        })
    }

    /// Reads a float32 or float64, widened to `f64`.
    pub fn unpack_f64(&mut self) -> Result<f64, MsgPackError> {
        let format = self.expect_kind(ValueKind::Float)?;
        let start = self.offset();
        self.reader.skip(1)?;
        let float = if format == FLOAT32 {
            self.reader.f32().map(|f| f as f64)
        } else {
            self.reader.f64()
        };
        float.map_err(|e| {
            self.reader.x = start;
            e.into()
        })
    }

    fn read_len(&mut self, format: u8) -> Result<usize, MsgPackError> {
        let r = &mut self.reader;
        r.skip(1)?;
        let len = match format {
            0x80..=0x8f => (format & 0x0f) as usize,
            0x90..=0x9f => (format & 0x0f) as usize,
            0xa0..=0xbf => (format & 0x1f) as usize,
            STR8 | BIN8 => r.u8()? as usize,
            STR16 | BIN16 | ARRAY16 | MAP16 => r.u16()? as usize,
            _ => r.u32()? as usize,
        };
        Ok(len)
    }

    fn header(&mut self, kind: ValueKind) -> Result<usize, MsgPackError> {
        let start = self.offset();
        let format = self.expect_kind(kind)?;
        self.read_len(format).map_err(|e| {
            self.reader.x = start;
            e
        })
    }

    pub fn unpack_str_header(&mut self) -> Result<usize, MsgPackError> {
        self.header(ValueKind::Str)
    }

    pub fn unpack_str(&mut self) -> Result<Cow<'a, str>, MsgPackError> {
        let start = self.offset();
        let len = self.unpack_str_header()?;
        let result = if self.strict_utf8 {
            self.reader.utf8(len).map(Cow::Borrowed).map_err(Into::into)
        } else {
            self.reader
                .buf(len)
                .map(String::from_utf8_lossy)
                .map_err(Into::into)
        };
        if result.is_err() {
            self.reader.x = start;
        }
        result
    }

    pub fn unpack_bin_header(&mut self) -> Result<usize, MsgPackError> {
        self.header(ValueKind::Bin)
    }

    pub fn unpack_bin(&mut self) -> Result<&'a [u8], MsgPackError> {
        let start = self.offset();
        let len = self.unpack_bin_header()?;
        self.reader.buf(len).map_err(|e| {
            self.reader.x = start;
            e.into()
        })
    }

    pub fn unpack_array_header(&mut self) -> Result<usize, MsgPackError> {
        self.header(ValueKind::Array)
    }

    pub fn unpack_map_header(&mut self) -> Result<usize, MsgPackError> {
        self.header(ValueKind::Map)
    }

    /// Reads an extension header, returning `(type_id, payload_len)`.
    pub fn unpack_ext_header(&mut self) -> Result<(i8, usize), MsgPackError> {
        let start = self.offset();
        let format = self.expect_kind(ValueKind::Ext)?;
        self.read_ext_header(format).map_err(|e| {
            self.reader.x = start;
            e
        })
    }

    fn read_ext_header(&mut self, format: u8) -> Result<(i8, usize), MsgPackError> {
        let r = &mut self.reader;
        r.skip(1)?;
        let len = match format {
            FIXEXT1 => 1,
            FIXEXT2 => 2,
            FIXEXT4 => 4,
            FIXEXT8 => 8,
            FIXEXT16 => 16,
            EXT8 => r.u8()? as usize,
            EXT16 => r.u16()? as usize,
            _ => r.u32()? as usize,
        };
        Ok((r.i8()?, len))
    }

    /// Reads `len` raw payload bytes, e.g. after [`Self::unpack_ext_header`].
    pub fn read_payload(&mut self, len: usize) -> Result<&'a [u8], MsgPackError> {
        Ok(self.reader.buf(len)?)
    }

    pub fn unpack_ext(&mut self) -> Result<ExtValue, MsgPackError> {
        let start = self.offset();
        let (type_id, len) = self.unpack_ext_header()?;
        let data = self.read_payload(len).map_err(|e| {
            self.reader.x = start;
            e
        })?;
        Ok(ExtValue::new(type_id, data.to_vec()))
    }

    pub fn unpack_timestamp(&mut self) -> Result<Timestamp, MsgPackError> {
        let start = self.offset();
        let result = self.unpack_ext().and_then(|ext| {
            if !ext.is_timestamp() {
                return Err(MsgPackError::UnexpectedExtType {
                    expected: TIMESTAMP_EXT_TYPE,
                    actual: ext.type_id,
                });
            }
            Timestamp::from_ext_payload(&ext.data)
        });
        if result.is_err() {
            self.reader.x = start;
        }
        result
    }

    /// Decodes the next value, recursively.
    pub fn unpack_value(&mut self) -> Result<Value, MsgPackError> {
        let value = match self.peek_kind()? {
            ValueKind::Nil => {
                self.unpack_nil()?;
                Value::Nil
            }
            ValueKind::Bool => Value::Bool(self.unpack_bool()?),
            ValueKind::Int if self.peek_format()? == UINT64 => Value::from(self.unpack_u64()?),
            ValueKind::Int => Value::Int(self.unpack_i64()?),
            ValueKind::Float => Value::Float(self.unpack_f64()?),
            ValueKind::Str => Value::Str(self.unpack_str()?.into_owned()),
            ValueKind::Bin => Value::Bin(self.unpack_bin()?.to_vec()),
            ValueKind::Array => self.nested(|u| {
                let len = u.unpack_array_header()?;
                let mut items = Vec::with_capacity(len.min(u.remaining()));
                for _ in 0..len {
                    items.push(u.unpack_value()?);
                }
                Ok::<_, MsgPackError>(Value::Array(items))
            })?,
            ValueKind::Map => self.nested(|u| {
                let len = u.unpack_map_header()?;
                let mut entries = Vec::with_capacity(len.min(u.remaining()));
                for _ in 0..len {
                    let key = u.unpack_value()?;
                    let val = u.unpack_value()?;
                    entries.push((key, val));
                }
                Ok::<_, MsgPackError>(Value::Map(entries))
            })?,
            ValueKind::Ext => Value::Ext(self.unpack_ext()?),
        };
        Ok(value)
    }

    /// Skips exactly one value, including all of its children.
    ///
    /// Iterative, so it needs no depth limit.
    pub fn skip_value(&mut self) -> Result<(), MsgPackError> {
        let mut remaining: usize = 1;
        while remaining > 0 {
            remaining -= 1;
            let format = self.peek_format()?;
            match self.peek_kind()? {
                ValueKind::Nil | ValueKind::Bool => self.reader.skip(1)?,
                ValueKind::Int => {
                    self.read_integer_body(format)?;
                }
                ValueKind::Float => {
                    self.reader.skip(if format == FLOAT32 { 5 } else { 9 })?;
                }
                ValueKind::Str | ValueKind::Bin => {
                    let len = self.read_len(format)?;
                    self.reader.skip(len)?;
                }
                ValueKind::Array => {
                    let len = self.read_len(format)?;
                    remaining = remaining.saturating_add(len);
                }
                ValueKind::Map => {
                    let len = self.read_len(format)?;
                    remaining = remaining.saturating_add(len.saturating_mul(2));
                }
                ValueKind::Ext => {
                    let (_, len) = self.read_ext_header(format)?;
                    self.reader.skip(len)?;
                }
            }
        }
        Ok(())
    }

    /// Returns the encoded bytes of the next value and moves past it.
    pub fn read_raw_value(&mut self) -> Result<&'a [u8], MsgPackError> {
        let start = self.offset();
        if let Err(e) = self.skip_value() {
            self.reader.x = start;
            return Err(e);
        }
        Ok(self.reader.since(start))
    }
}
