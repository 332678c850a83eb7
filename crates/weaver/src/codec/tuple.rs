use std::sync::Arc;

use weaver_msgpack::{Packer, Unpacker};

use super::{unpack_one, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::{Args, Dyn};
use crate::error::{Result, WeaverError};
use crate::surface::Surface;

/// Tuples as a fixed-length array, one codec per component.
pub(crate) struct TupleCodec {
    surface: Surface,
    elements: Vec<Arc<dyn MessageCodec>>,
}

impl TupleCodec {
    pub(crate) const MAX_ARITY: usize = 7;

    pub(crate) fn new(surface: Surface, elements: Vec<Arc<dyn MessageCodec>>) -> Self {
        Self { surface, elements }
    }
}

impl MessageCodec for TupleCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        let parts = self.surface.deconstruct(value)?;
        p.pack_array_header(parts.len())?;
        for (codec, part) in self.elements.iter().zip(&parts) {
            codec.pack(part, p, config)?;
        }
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let parts = u.nested(|u| -> Result<Vec<Dyn>> {
            let len = u.unpack_array_header()?;
            if len != self.elements.len() {
                return Err(WeaverError::IllegalArgument(format!(
                    "expected {} elements for {}, got {len}",
                    self.elements.len(),
                    self.surface
                )));
            }
            let mut parts = Vec::with_capacity(len);
            for codec in &self.elements {
                parts.push(unpack_one(codec.as_ref(), u, ctx)?);
            }
            Ok(parts)
        })?;
        let tuple = self.surface.construct(Args(parts))?;
        ctx.set_object(tuple);
        Ok(())
    }
}
