use std::any::type_name;

use weaver_msgpack::{MsgPackError, Packer, Unpacker, ValueKind};

use super::{instance, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};
use crate::surface::Primitive;

/// Scalars, strings and binary.
///
/// Decoding is lenient across wire kinds: numbers may arrive as strings,
/// integral floats as integers, booleans as 0/1, and nil always yields the
/// zero of the target.
pub(crate) struct PrimitiveCodec {
    primitive: Primitive,
}

impl PrimitiveCodec {
    pub(crate) fn new(primitive: Primitive) -> Self {
        Self { primitive }
    }
}

fn mismatch(expected: ValueKind, actual: ValueKind) -> WeaverError {
    MsgPackError::TypeMismatch { expected, actual }.into()
}

fn narrow<T: TryFrom<i128>>(int: i128) -> Result<T> {
    T::try_from(int).map_err(|_| {
        MsgPackError::IntegerOverflow {
            value: int,
            target: type_name::<T>(),
        }
        .into()
    })
}

fn read_int(u: &mut Unpacker<'_>) -> Result<i128> {
    match u.unpack_i64() {
        Ok(int) => Ok(int as i128),
        Err(MsgPackError::IntegerOverflow { .. }) => Ok(u.unpack_u64()? as i128),
        Err(err) => Err(err.into()),
    }
}

fn read_integer(u: &mut Unpacker<'_>, target: &str) -> Result<i128> {
    match u.peek_kind()? {
        ValueKind::Int => read_int(u),
        ValueKind::Float => {
            let float = u.unpack_f64()?;
            if float.is_finite() && float.fract() == 0.0 && float.abs() < 1.8e19 {
                Ok(float as i128)
            } else {
                Err(WeaverError::cannot_convert(float, target))
            }
        }
        ValueKind::Str => {
            let text = u.unpack_str()?;
            text.trim()
                .parse::<i128>()
                .map_err(|_| WeaverError::cannot_convert(format!("{text:?}"), target))
        }
        ValueKind::Bool => Ok(u.unpack_bool()? as i128),
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok(0)
        }
        other => Err(mismatch(ValueKind::Int, other)),
    }
}

fn read_float(u: &mut Unpacker<'_>, target: &str) -> Result<f64> {
    match u.peek_kind()? {
        ValueKind::Float => Ok(u.unpack_f64()?),
        ValueKind::Int => Ok(read_int(u)? as f64),
        ValueKind::Str => {
            let text = u.unpack_str()?;
            text.trim()
                .parse::<f64>()
                .map_err(|_| WeaverError::cannot_convert(format!("{text:?}"), target))
        }
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok(0.0)
        }
        other => Err(mismatch(ValueKind::Float, other)),
    }
}

fn read_bool(u: &mut Unpacker<'_>) -> Result<bool> {
    match u.peek_kind()? {
        ValueKind::Bool => Ok(u.unpack_bool()?),
        ValueKind::Str => {
            let text = u.unpack_str()?;
            if text.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if text.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(WeaverError::cannot_convert(format!("{text:?}"), "bool"))
            }
        }
        ValueKind::Int => match read_int(u)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WeaverError::cannot_convert(other, "bool")),
        },
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok(false)
        }
        other => Err(mismatch(ValueKind::Bool, other)),
    }
}

fn read_string(u: &mut Unpacker<'_>) -> Result<String> {
    match u.peek_kind()? {
        ValueKind::Str => Ok(u.unpack_str()?.into_owned()),
        ValueKind::Int => Ok(read_int(u)?.to_string()),
        ValueKind::Float => Ok(u.unpack_f64()?.to_string()),
        ValueKind::Bool => Ok(u.unpack_bool()?.to_string()),
        ValueKind::Bin => Ok(String::from_utf8_lossy(u.unpack_bin()?).into_owned()),
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok(String::new())
        }
        other => Err(mismatch(ValueKind::Str, other)),
    }
}

fn read_char(u: &mut Unpacker<'_>) -> Result<char> {
    match u.peek_kind()? {
        ValueKind::Str => {
            let text = u.unpack_str()?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(WeaverError::cannot_convert(format!("{text:?}"), "char")),
            }
        }
        ValueKind::Int => {
            let code = read_int(u)?;
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| WeaverError::cannot_convert(code, "char"))
        }
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok('\0')
        }
        other => Err(mismatch(ValueKind::Str, other)),
    }
}

fn read_binary(u: &mut Unpacker<'_>) -> Result<Vec<u8>> {
    match u.peek_kind()? {
        ValueKind::Bin => Ok(u.unpack_bin()?.to_vec()),
        ValueKind::Str => Ok(u.unpack_str()?.into_owned().into_bytes()),
        ValueKind::Nil => {
            u.unpack_nil()?;
            Ok(Vec::new())
        }
        other => Err(mismatch(ValueKind::Bin, other)),
    }
}

impl MessageCodec for PrimitiveCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        match self.primitive {
            Primitive::Unit => p.pack_nil(),
            Primitive::Bool => p.pack_bool(*instance::<bool>(value)?),
            Primitive::I8 => p.pack_i64(*instance::<i8>(value)? as i64),
            Primitive::I16 => p.pack_i64(*instance::<i16>(value)? as i64),
            Primitive::I32 => p.pack_i64(*instance::<i32>(value)? as i64),
            Primitive::I64 => p.pack_i64(*instance::<i64>(value)?),
            Primitive::U8 => p.pack_u64(*instance::<u8>(value)? as u64),
            Primitive::U16 => p.pack_u64(*instance::<u16>(value)? as u64),
            Primitive::U32 => p.pack_u64(*instance::<u32>(value)? as u64),
            Primitive::U64 => p.pack_u64(*instance::<u64>(value)?),
            Primitive::F32 => p.pack_f32(*instance::<f32>(value)?),
            Primitive::F64 => p.pack_f64(*instance::<f64>(value)?),
            Primitive::Char => {
                let mut buf = [0u8; 4];
                p.pack_str(instance::<char>(value)?.encode_utf8(&mut buf))?;
            }
            Primitive::String => p.pack_str(instance::<String>(value)?)?,
            Primitive::Binary => p.pack_bin(instance::<Vec<u8>>(value)?)?,
        }
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        match self.primitive {
            Primitive::Unit => {
                u.skip_value()?;
                ctx.set_null();
            }
            Primitive::Bool => ctx.set_bool(read_bool(u)?),
            Primitive::I8 => ctx.set_object(narrow::<i8>(read_integer(u, "i8")?)?),
            Primitive::I16 => ctx.set_object(narrow::<i16>(read_integer(u, "i16")?)?),
            Primitive::I32 => ctx.set_object(narrow::<i32>(read_integer(u, "i32")?)?),
            Primitive::I64 => ctx.set_i64(narrow::<i64>(read_integer(u, "i64")?)?),
            Primitive::U8 => ctx.set_object(narrow::<u8>(read_integer(u, "u8")?)?),
            Primitive::U16 => ctx.set_object(narrow::<u16>(read_integer(u, "u16")?)?),
            Primitive::U32 => ctx.set_object(narrow::<u32>(read_integer(u, "u32")?)?),
            Primitive::U64 => ctx.set_object(narrow::<u64>(read_integer(u, "u64")?)?),
            Primitive::F32 => ctx.set_object(read_float(u, "f32")? as f32),
            Primitive::F64 => ctx.set_f64(read_float(u, "f64")?),
            Primitive::Char => ctx.set_object(read_char(u)?),
            Primitive::String => ctx.set_str(read_string(u)?),
            Primitive::Binary => ctx.set_bytes(read_binary(u)?),
        }
        Ok(())
    }
}
