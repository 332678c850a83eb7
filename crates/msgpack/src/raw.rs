//! [`RawMsgPack`]: pre-encoded MessagePack value wrapper.

use crate::{MsgPackError, Unpacker, Value};

/// Bytes holding exactly one already-encoded MessagePack value.
///
/// Encoders write the contents as-is with
/// [`Packer::write_payload`](crate::Packer::write_payload) instead of
/// re-encoding them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawMsgPack {
    pub bytes: Vec<u8>,
}

impl RawMsgPack {
    /// Wraps `bytes`, checking that they hold exactly one value.
    pub fn new(bytes: Vec<u8>) -> Result<Self, MsgPackError> {
        let mut unpacker = Unpacker::new(&bytes);
        unpacker.skip_value()?;
        if unpacker.has_next() {
            return Err(MsgPackError::TrailingBytes {
                offset: unpacker.offset(),
            });
        }
        Ok(Self { bytes })
    }

    pub fn from_value(value: &Value) -> Result<Self, MsgPackError> {
        Ok(Self {
            bytes: crate::encode(value)?,
        })
    }

    pub fn to_value(&self) -> Result<Value, MsgPackError> {
        crate::decode(&self.bytes)
    }
}
