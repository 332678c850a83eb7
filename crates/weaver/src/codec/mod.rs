//! The [`MessageCodec`] trait and the built-in codecs the registry derives.

mod container;
mod dynamic;
mod enums;
mod primitive;
mod record;
mod time;
mod tuple;

use std::any::{self, Any};

use weaver_msgpack::{Packer, Unpacker};

use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};

pub(crate) use container::{MapCodec, OptionCodec, SeqCodec};
pub(crate) use dynamic::{AnyCodec, LazyCodec, RawCodec};
pub(crate) use enums::EnumCodec;
pub(crate) use primitive::PrimitiveCodec;
pub(crate) use record::RecordCodec;
pub(crate) use time::{DateTimeCodec, DurationCodec, NaiveDateCodec};
pub(crate) use tuple::TupleCodec;

/// Packs and unpacks instances of one type.
///
/// Codecs are stateless and shared: the registry hands out the same
/// `Arc<dyn MessageCodec>` to every caller.
pub trait MessageCodec: Send + Sync {
    /// Writes `value` to `packer`.
    fn pack(&self, value: &Dyn, packer: &mut Packer, config: &WeaverConfig) -> Result<()>;

    /// Reads one value from `unpacker` and reports it through `ctx`.
    fn unpack(&self, unpacker: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()>;
}

/// Borrows `value` as a `T`.
pub(crate) fn instance<T: Any>(value: &Dyn) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(|| WeaverError::Downcast {
        expected: any::type_name::<T>(),
        actual: value.type_name(),
    })
}

/// Runs `codec` and collects what it decoded.
pub(crate) fn unpack_one(
    codec: &dyn MessageCodec,
    unpacker: &mut Unpacker<'_>,
    ctx: &mut WeaverContext,
) -> Result<Dyn> {
    codec.unpack(unpacker, ctx)?;
    Ok(ctx.take())
}
