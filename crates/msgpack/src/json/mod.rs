//! JSON bridge: JSON text ⇄ [`Value`](crate::Value) and MessagePack bytes.
//!
//! JSON is self-describing, so no type descriptor is involved:
//!
//! | JSON                        | MessagePack            |
//! |-----------------------------|------------------------|
//! | object                      | map with string keys   |
//! | array                       | array                  |
//! | string                      | str                    |
//! | `null`                      | nil                    |
//! | `true` / `false`            | bool                   |
//! | number, no fraction/exponent| int                    |
//! | number with fraction/exponent | float                |
//!
//! Object key order is kept and duplicate keys are not merged.
//!
//! Going back to JSON, a timestamp extension renders as its RFC 3339 string,
//! binary renders as a (lossy) UTF-8 string, and any other extension renders
//! as the two-element array `[type_id, "<base64 payload>"]`.

mod error;
mod parser;
mod writer;

pub use error::JsonError;
pub use parser::parse;
pub use writer::{msgpack_to_json, msgpack_to_json_with, to_json, to_json_with, JsonOptions, JsonWriter};

use crate::Packer;

/// Transcodes JSON text straight to MessagePack bytes.
pub fn json_to_msgpack(text: &str) -> Result<Vec<u8>, JsonError> {
    let value = parse(text)?;
    let mut packer = Packer::new();
    packer.pack_value(&value)?;
    Ok(packer.into_bytes())
}
