//! Descriptor-driven MessagePack serialization.
//!
//! A [`Surface`] describes a type; the [`Weaver`] registry turns surfaces
//! into [`MessageCodec`]s, synthesizes zero values and bridges to JSON. The
//! free functions here use the process-wide [`Weaver::global`] registry.
//!
//! ```
//! use std::time::Duration;
//!
//! let json = weaver::to_json_as(&Duration::from_secs(90)).unwrap();
//! assert_eq!(json, "\"PT1M30S\"");
//! let back: Duration = weaver::from_json_as(&json).unwrap();
//! assert_eq!(back, Duration::from_secs(90));
//!
//! let bytes = weaver::pack_as(&vec![1i64, 2, 3]).unwrap();
//! assert_eq!(bytes, [0x93, 0x01, 0x02, 0x03]);
//! ```

mod codec;
mod config;
mod context;
mod dynamic;
mod error;
mod registry;
mod surface;
mod zero;

pub use codec::MessageCodec;
pub use config::WeaverConfig;
pub use context::WeaverContext;
pub use dynamic::{Args, Dyn, Instance};
pub use error::{Result, WeaverError};
pub use registry::Weaver;
pub use surface::{
    Accessor, Data, Deconstructor, Factory, HasSurface, Param, Primitive, Shape, Surface,
    SurfaceBuilder, Variant,
};
pub use weaver_msgpack as msgpack;

/// Packs `value` as described by `surface`.
pub fn pack(value: &Dyn, surface: &Surface) -> Result<Vec<u8>> {
    Weaver::global().pack(value, surface)
}

/// Unpacks the first value in `bytes` as described by `surface`.
pub fn unpack(bytes: &[u8], surface: &Surface) -> Result<Dyn> {
    Weaver::global().unpack(bytes, surface)
}

pub fn to_json(value: &Dyn, surface: &Surface) -> Result<String> {
    Weaver::global().to_json(value, surface)
}

pub fn from_json(text: &str, surface: &Surface) -> Result<Dyn> {
    Weaver::global().from_json(text, surface)
}

pub fn zero_of(surface: &Surface) -> Result<Dyn> {
    Weaver::global().zero_of(surface)
}

pub fn register_codec<C: MessageCodec + 'static>(surface: &Surface, codec: C) {
    Weaver::global().register_codec(surface, codec)
}

pub fn register_zero<V: Data>(surface: &Surface, zero: V) {
    Weaver::global().register_zero(surface, zero)
}

pub fn pack_as<T: HasSurface>(value: &T) -> Result<Vec<u8>> {
    Weaver::global().pack_as(value)
}

pub fn unpack_as<T: HasSurface>(bytes: &[u8]) -> Result<T> {
    Weaver::global().unpack_as(bytes)
}

pub fn to_json_as<T: HasSurface>(value: &T) -> Result<String> {
    Weaver::global().to_json_as(value)
}

pub fn from_json_as<T: HasSurface>(text: &str) -> Result<T> {
    Weaver::global().from_json_as(text)
}

/// The zero value of `T`.
pub fn zero<T: HasSurface>() -> Result<T> {
    Weaver::global().zero_as()
}
