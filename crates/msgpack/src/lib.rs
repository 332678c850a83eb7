//! MessagePack value model, streaming packer/unpacker and JSON bridge.
//!
//! # Overview
//!
//! - [`Value`] - the canonical in-memory form of one MessagePack value
//! - [`Packer`] - append-only encoder; every header uses its shortest form
//! - [`Unpacker`] - cursor decoder with [`Unpacker::peek_kind`] and
//!   [`Unpacker::skip_value`] for type-directed dispatch
//! - [`Timestamp`] - the reserved timestamp extension (type id `-1`)
//! - [`RawMsgPack`] - already-encoded bytes spliced verbatim by encoders
//! - [`json`] - JSON text ⇄ [`Value`] / MessagePack bytes
//!
//! # Example
//!
//! ```
//! use weaver_msgpack::{Packer, Unpacker, Value};
//!
//! let mut packer = Packer::new();
//! packer.pack_map_header(1).unwrap();
//! packer.pack_str("a").unwrap();
//! packer.pack_i64(128);
//! let bytes = packer.into_bytes();
//! assert_eq!(bytes, vec![0x81, 0xa1, b'a', 0xcc, 0x80]);
//!
//! let value = Unpacker::new(&bytes).unpack_value().unwrap();
//! assert_eq!(value.get("a"), Some(&Value::Int(128)));
//! ```

mod constants;
mod error;
mod packer;
mod raw;
mod timestamp;
mod unpacker;
mod value;

pub mod json;

pub use constants::TIMESTAMP_EXT_TYPE;
pub use error::MsgPackError;
pub use packer::Packer;
pub use raw::RawMsgPack;
pub use timestamp::Timestamp;
pub use unpacker::{Unpacker, MAX_DEPTH};
pub use value::{ExtValue, Value, ValueKind};

/// Encodes a [`Value`] into MessagePack bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, MsgPackError> {
    Packer::new().encode(value)
}

/// Decodes one [`Value`] from the start of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value, MsgPackError> {
    Unpacker::new(bytes).unpack_value()
}
