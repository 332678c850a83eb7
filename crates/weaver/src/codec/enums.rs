use weaver_msgpack::{Packer, Unpacker};

use super::MessageCodec;
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};
use crate::surface::Surface;

/// Enum variants travel as their name.
pub(crate) struct EnumCodec {
    surface: Surface,
}

impl EnumCodec {
    pub(crate) fn new(surface: Surface) -> Self {
        Self { surface }
    }
}

impl MessageCodec for EnumCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        let variant = self
            .surface
            .variants()
            .iter()
            .find(|variant| variant.value == *value)
            .ok_or_else(|| {
                WeaverError::IllegalArgument(format!(
                    "{value:?} is not a variant of {}",
                    self.surface
                ))
            })?;
        p.pack_str(&variant.name)?;
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let name = u.unpack_str()?;
        let variant = self
            .surface
            .variants()
            .iter()
            .find(|variant| variant.name.eq_ignore_ascii_case(&name))
            .ok_or_else(|| {
                WeaverError::IllegalArgument(format!(
                    "unknown variant {name:?} of {}",
                    self.surface
                ))
            })?;
        ctx.set_object(variant.value.clone());
        Ok(())
    }
}
