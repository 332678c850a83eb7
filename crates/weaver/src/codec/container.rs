use std::sync::Arc;

use weaver_msgpack::{Packer, Unpacker};

use super::{unpack_one, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::{Args, Dyn};
use crate::error::Result;
use crate::surface::Surface;

/// `None` is nil; `Some(x)` is the bare inner value.
pub(crate) struct OptionCodec {
    surface: Surface,
    inner: Arc<dyn MessageCodec>,
}

impl OptionCodec {
    pub(crate) fn new(surface: Surface, inner: Arc<dyn MessageCodec>) -> Self {
        Self { surface, inner }
    }
}

impl MessageCodec for OptionCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        match self.surface.deconstruct(value)?.first() {
            Some(inner) => self.inner.pack(inner, p, config),
            None => {
                p.pack_nil();
                Ok(())
            }
        }
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let parts = if u.try_unpack_nil()? {
            Vec::new()
        } else {
            vec![unpack_one(self.inner.as_ref(), u, ctx)?]
        };
        let option = self.surface.construct(Args(parts))?;
        ctx.set_object(option);
        Ok(())
    }
}

/// Sequences, sets and arrays as a MessagePack array.
pub(crate) struct SeqCodec {
    surface: Surface,
    element: Arc<dyn MessageCodec>,
}

impl SeqCodec {
    pub(crate) fn new(surface: Surface, element: Arc<dyn MessageCodec>) -> Self {
        Self { surface, element }
    }
}

impl MessageCodec for SeqCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        let items = self.surface.deconstruct(value)?;
        p.pack_array_header(items.len())?;
        for item in &items {
            self.element.pack(item, p, config)?;
        }
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let mut items = Vec::new();
        if !u.try_unpack_nil()? {
            u.nested(|u| -> Result<()> {
                let len = u.unpack_array_header()?;
                items.reserve(len.min(u.remaining()));
                for _ in 0..len {
                    items.push(unpack_one(self.element.as_ref(), u, ctx)?);
                }
                Ok(())
            })?;
        }
        let seq = self.surface.construct(Args(items))?;
        ctx.set_object(seq);
        Ok(())
    }
}

/// Maps as a MessagePack map, entries in iteration order.
pub(crate) struct MapCodec {
    surface: Surface,
    key: Arc<dyn MessageCodec>,
    value: Arc<dyn MessageCodec>,
}

impl MapCodec {
    pub(crate) fn new(
        surface: Surface,
        key: Arc<dyn MessageCodec>,
        value: Arc<dyn MessageCodec>,
    ) -> Self {
        Self {
            surface,
            key,
            value,
        }
    }
}

impl MessageCodec for MapCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        let parts = self.surface.deconstruct(value)?;
        p.pack_map_header(parts.len() / 2)?;
        for entry in parts.chunks_exact(2) {
            self.key.pack(&entry[0], p, config)?;
            self.value.pack(&entry[1], p, config)?;
        }
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let mut parts = Vec::new();
        if !u.try_unpack_nil()? {
            u.nested(|u| -> Result<()> {
                let len = u.unpack_map_header()?;
                parts.reserve(len.min(u.remaining()) * 2);
                for _ in 0..len {
                    parts.push(unpack_one(self.key.as_ref(), u, ctx)?);
                    parts.push(unpack_one(self.value.as_ref(), u, ctx)?);
                }
                Ok(())
            })?;
        }
        let map = self.surface.construct(Args(parts))?;
        ctx.set_object(map);
        Ok(())
    }
}
