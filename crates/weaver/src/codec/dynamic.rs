use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use weaver_msgpack::{Packer, RawMsgPack, Timestamp, Unpacker, Value};

use super::{instance, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};
use crate::registry::WeakWeaver;
use crate::surface::Surface;

/// Codec for `Any`-shaped surfaces.
///
/// Packs whatever common value it is handed and unpacks to a [`Value`].
pub(crate) struct AnyCodec;

macro_rules! pack_first_match {
    ($value:expr; $($t:ty => |$x:ident| $pack:expr),+ $(,)?) => {
        $(
            if let Some($x) = $value.downcast_ref::<$t>() {
                $pack;
                return Ok(());
            }
        )+
    };
}

fn pack_dynamic(value: &Dyn, p: &mut Packer) -> Result<()> {
    pack_first_match! { value;
        Value => |v| p.pack_value(v)?,
        () => |_v| p.pack_nil(),
        bool => |b| p.pack_bool(*b),
        i8 => |i| p.pack_i64(*i as i64),
        i16 => |i| p.pack_i64(*i as i64),
        i32 => |i| p.pack_i64(*i as i64),
        i64 => |i| p.pack_i64(*i),
        u8 => |i| p.pack_u64(*i as u64),
        u16 => |i| p.pack_u64(*i as u64),
        u32 => |i| p.pack_u64(*i as u64),
        u64 => |i| p.pack_u64(*i),
        f32 => |f| p.pack_f32(*f),
        f64 => |f| p.pack_f64(*f),
        String => |s| p.pack_str(s)?,
        &'static str => |s| p.pack_str(s)?,
        Vec<u8> => |b| p.pack_bin(b)?,
        RawMsgPack => |raw| p.write_payload(&raw.bytes),
        Timestamp => |ts| p.pack_timestamp(ts)?,
        DateTime<Utc> => |dt| p.pack_timestamp(&Timestamp::from_datetime(dt))?,
    }
    if let Some(items) = value.downcast_ref::<Vec<Dyn>>() {
        p.pack_array_header(items.len())?;
        for item in items {
            pack_dynamic(item, p)?;
        }
        return Ok(());
    }
    if let Some(entries) = value.downcast_ref::<Vec<(Dyn, Dyn)>>() {
        p.pack_map_header(entries.len())?;
        for (key, item) in entries {
            pack_dynamic(key, p)?;
            pack_dynamic(item, p)?;
        }
        return Ok(());
    }
    Err(WeaverError::UnsupportedType(format!(
        "cannot pack {} without a surface",
        value.type_name()
    )))
}

impl MessageCodec for AnyCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        pack_dynamic(value, p)
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        ctx.set_object(u.unpack_value()?);
        Ok(())
    }
}

/// Passes pre-encoded bytes through untouched.
pub(crate) struct RawCodec;

impl MessageCodec for RawCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        p.write_payload(&instance::<RawMsgPack>(value)?.bytes);
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let bytes = u.read_raw_value()?.to_vec();
        ctx.set_object(RawMsgPack { bytes });
        Ok(())
    }
}

/// Stands in for a codec that is still being derived; resolves it from the
/// registry on first use.
pub(crate) struct LazyCodec {
    weaver: WeakWeaver,
    surface: Surface,
    codec: OnceLock<Arc<dyn MessageCodec>>,
}

impl LazyCodec {
    pub(crate) fn new(weaver: WeakWeaver, surface: Surface) -> Self {
        Self {
            weaver,
            surface,
            codec: OnceLock::new(),
        }
    }

    fn codec(&self) -> Result<&Arc<dyn MessageCodec>> {
        if let Some(codec) = self.codec.get() {
            return Ok(codec);
        }
        let resolved = self.weaver.upgrade()?.resolve(&self.surface)?;
        Ok(self.codec.get_or_init(|| resolved))
    }
}

impl MessageCodec for LazyCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        self.codec()?.pack(value, p, config)
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        self.codec()?.unpack(u, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(value: Dyn) -> Result<Vec<u8>> {
        let mut p = Packer::new();
        AnyCodec.pack(&value, &mut p, &WeaverConfig::default())?;
        Ok(p.into_bytes())
    }

    #[test]
    fn packs_common_values() {
        assert_eq!(pack(Dyn::new(5u8)).unwrap(), vec![0x05]);
        assert_eq!(pack(Dyn::null()).unwrap(), vec![0xc0]);
        assert_eq!(pack(Dyn::new("a")).unwrap(), vec![0xa1, b'a']);
        let list = vec![Dyn::new(true), Dyn::new(Value::Int(-1))];
        assert_eq!(pack(Dyn::new(list)).unwrap(), vec![0x92, 0xc3, 0xff]);
        let raw = RawMsgPack::new(vec![0x91, 0x01]).unwrap();
        assert_eq!(pack(Dyn::new(raw)).unwrap(), vec![0x91, 0x01]);
    }

    #[test]
    fn unknown_types_need_a_surface() {
        #[derive(Debug, Clone, PartialEq)]
        struct Custom;
        assert!(matches!(
            pack(Dyn::new(Custom)),
            Err(WeaverError::UnsupportedType(_))
        ));
    }

    #[test]
    fn unpacks_to_value() {
        let bytes = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0xc0];
        let mut ctx = WeaverContext::new(WeaverConfig::default());
        AnyCodec.unpack(&mut Unpacker::new(&bytes), &mut ctx).unwrap();
        assert_eq!(
            ctx.take(),
            Dyn::new(Value::Map(vec![
                ("a".into(), Value::Int(1)),
                ("b".into(), Value::Nil),
            ]))
        );
    }

    #[test]
    fn raw_values_pass_through() {
        let bytes = [0x92, 0x01, 0xa1, b'x', 0xc3];
        let mut u = Unpacker::new(&bytes);
        let mut ctx = WeaverContext::new(WeaverConfig::default());
        RawCodec.unpack(&mut u, &mut ctx).unwrap();
        assert_eq!(
            ctx.take().take::<RawMsgPack>().unwrap().bytes,
            vec![0x92, 0x01, 0xa1, b'x']
        );
        assert_eq!(u.offset(), 4);
    }
}
