//! `Packer`: append-only MessagePack encoder.

use std::io;

use weaver_buffers::Writer;

use crate::constants::*;
use crate::{ExtValue, MsgPackError, Timestamp, Value};

/// Append-only MessagePack encoder.
///
/// Every header is written in its shortest legal form: `127` is the single
/// byte `0x7f`, `128` is `0xcc 0x80`, a 31-byte string gets a `fixstr`
/// header and a 32-byte one a `str8` header.
///
/// Array and map headers only announce a count; the caller writes exactly
/// that many children (two per map entry) afterwards.
#[derive(Debug, Clone, Default)]
pub struct Packer {
    pub writer: Writer,
}

impl Packer {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(),
        }
    }

    pub fn with_writer(writer: Writer) -> Self {
        Self { writer }
    }

    /// Number of bytes packed so far.
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Copies out the bytes packed so far.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.writer.as_slice().to_vec()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_vec()
    }

    /// Returns the packed bytes and resets the packer for reuse.
    pub fn flush(&mut self) -> Vec<u8> {
        self.writer.flush()
    }

    /// Streams the packed bytes to a sink.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        self.writer.write_to(sink)
    }

    /// Encodes a whole [`Value`] and returns the bytes.
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, MsgPackError> {
        self.writer.reset();
        self.pack_value(value)?;
        Ok(self.writer.flush())
    }

    pub fn pack_nil(&mut self) {
        self.writer.u8(NIL);
    }

    pub fn pack_bool(&mut self, b: bool) {
        self.writer.u8(if b { TRUE } else { FALSE });
    }

    pub fn pack_i64(&mut self, int: i64) {
        if int >= 0 {
            self.pack_u64(int as u64);
            return;
        }
        let w = &mut self.writer;
        if int >= NEGFIXINT_PREFIX as i8 as i64 {
            w.i8(int as i8);
        } else if int >= i8::MIN as i64 {
            w.u8u8(INT8, int as i8 as u8);
        } else if int >= i16::MIN as i64 {
            w.u8u16(INT16, int as i16 as u16);
        } else if int >= i32::MIN as i64 {
            w.u8u32(INT32, int as i32 as u32);
        } else {
            w.u8u64(INT64, int as u64);
        }
    }

    pub fn pack_u64(&mut self, uint: u64) {
        let w = &mut self.writer;
        if uint <= POSFIXINT_MAX as u64 {
            w.u8(uint as u8);
        } else if uint <= 0xff {
            w.u8u8(UINT8, uint as u8);
        } else if uint <= 0xffff {
            w.u8u16(UINT16, uint as u16);
        } else if uint <= 0xffff_ffff {
            w.u8u32(UINT32, uint as u32);
        } else {
            w.u8u64(UINT64, uint);
        }
    }

    pub fn pack_f32(&mut self, float: f32) {
        self.writer.u8f32(FLOAT32, float);
    }

    pub fn pack_f64(&mut self, float: f64) {
        self.writer.u8f64(FLOAT64, float);
    }

    fn checked_len(len: usize) -> Result<u32, MsgPackError> {
        u32::try_from(len).map_err(|_| MsgPackError::LengthOverflow { len })
    }

    pub fn pack_str_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        let len = Self::checked_len(len)?;
        let w = &mut self.writer;
        if len < 32 {
            w.u8(FIXSTR_PREFIX | len as u8);
        } else if len <= 0xff {
            w.u8u8(STR8, len as u8);
        } else if len <= 0xffff {
            w.u8u16(STR16, len as u16);
        } else {
            w.u8u32(STR32, len);
        }
        Ok(())
    }

    pub fn pack_str(&mut self, s: &str) -> Result<(), MsgPackError> {
        self.pack_str_header(s.len())?;
        self.writer.utf8(s);
        Ok(())
    }

    pub fn pack_bin_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        let len = Self::checked_len(len)?;
        let w = &mut self.writer;
        if len <= 0xff {
            w.u8u8(BIN8, len as u8);
        } else if len <= 0xffff {
            w.u8u16(BIN16, len as u16);
        } else {
            w.u8u32(BIN32, len);
        }
        Ok(())
    }

    pub fn pack_bin(&mut self, bytes: &[u8]) -> Result<(), MsgPackError> {
        self.pack_bin_header(bytes.len())?;
        self.writer.buf(bytes);
        Ok(())
    }

    pub fn pack_array_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        let len = Self::checked_len(len)?;
        let w = &mut self.writer;
        if len < 16 {
            w.u8(FIXARRAY_PREFIX | len as u8);
        } else if len <= 0xffff {
            w.u8u16(ARRAY16, len as u16);
        } else {
            w.u8u32(ARRAY32, len);
        }
        Ok(())
    }

    pub fn pack_map_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        let len = Self::checked_len(len)?;
        let w = &mut self.writer;
        if len < 16 {
            w.u8(FIXMAP_PREFIX | len as u8);
        } else if len <= 0xffff {
            w.u8u16(MAP16, len as u16);
        } else {
            w.u8u32(MAP32, len);
        }
        Ok(())
    }

    pub fn pack_ext_header(&mut self, type_id: i8, len: usize) -> Result<(), MsgPackError> {
        let len = Self::checked_len(len)?;
        let w = &mut self.writer;
        match len {
            1 => w.u8(FIXEXT1),
            2 => w.u8(FIXEXT2),
            4 => w.u8(FIXEXT4),
            8 => w.u8(FIXEXT8),
            16 => w.u8(FIXEXT16),
            _ if len <= 0xff => w.u8u8(EXT8, len as u8),
            _ if len <= 0xffff => w.u8u16(EXT16, len as u16),
            _ => w.u8u32(EXT32, len),
        }
        w.i8(type_id);
        Ok(())
    }

    pub fn pack_ext(&mut self, type_id: i8, data: &[u8]) -> Result<(), MsgPackError> {
        self.pack_ext_header(type_id, data.len())?;
        self.writer.buf(data);
        Ok(())
    }

    pub fn pack_timestamp(&mut self, ts: &Timestamp) -> Result<(), MsgPackError> {
        self.pack_ext(TIMESTAMP_EXT_TYPE, &ts.to_ext_payload())
    }

    /// Splices already-encoded MessagePack bytes verbatim.
    ///
    /// The caller is responsible for `bytes` holding whole values.
    pub fn write_payload(&mut self, bytes: &[u8]) {
        self.writer.buf(bytes);
    }

    pub fn pack_value(&mut self, value: &Value) -> Result<(), MsgPackError> {
        match value {
            Value::Nil => self.pack_nil(),
            Value::Bool(b) => self.pack_bool(*b),
            Value::Int(i) => self.pack_i64(*i),
            Value::UInt(u) => self.pack_u64(*u),
            Value::Float(f) => self.pack_f64(*f),
            Value::Str(s) => self.pack_str(s)?,
            Value::Bin(b) => self.pack_bin(b)?,
            Value::Array(items) => {
                self.pack_array_header(items.len())?;
                for item in items {
                    self.pack_value(item)?;
                }
            }
            Value::Map(entries) => {
                self.pack_map_header(entries.len())?;
                for (key, val) in entries {
                    self.pack_value(key)?;
                    self.pack_value(val)?;
                }
            }
            Value::Ext(ExtValue { type_id, data }) => self.pack_ext(*type_id, data)?,
        }
        Ok(())
    }
}
