//! MessagePack packer/unpacker error type.

use thiserror::Error;
use weaver_buffers::BufferError;

use crate::ValueKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgPackError {
    #[error("input truncated at offset {offset}")]
    InputTruncated { offset: usize },
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidString { offset: usize },
    #[error("reserved MessagePack byte 0xc1 at offset {offset}")]
    ReservedByte { offset: usize },
    #[error("integer {value} is out of range for {target}")]
    IntegerOverflow { value: i128, target: &'static str },
    #[error("length {len} exceeds the MessagePack limit")]
    LengthOverflow { len: usize },
    #[error("invalid timestamp payload of {len} byte(s)")]
    InvalidTimestamp { len: usize },
    #[error("trailing bytes after the value at offset {offset}")]
    TrailingBytes { offset: usize },
    #[error("nesting deeper than {max} levels at offset {offset}", max = crate::MAX_DEPTH)]
    DepthExceeded { offset: usize },
    #[error("expected extension type {expected}, found {actual}")]
    UnexpectedExtType { expected: i8, actual: i8 },
}

impl From<BufferError> for MsgPackError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer { offset, .. } => MsgPackError::InputTruncated { offset },
            BufferError::InvalidUtf8 { offset } => MsgPackError::InvalidString { offset },
        }
    }
}
