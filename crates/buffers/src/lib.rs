//! Binary buffer utilities for weaver.
//!
//! This crate provides the byte-level cursor types the MessagePack packer and
//! unpacker are built on.
//!
//! # Overview
//!
//! - [`Reader`] - Reads big-endian binary data from a byte slice with cursor
//!   tracking. Every read is bounds-checked.
//! - [`Writer`] - Writes big-endian binary data to an auto-growing buffer.
//!
//! # Example
//!
//! ```
//! use weaver_buffers::{Reader, Writer};
//!
//! // Write some data
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.u16(0x0203);
//! writer.utf8("hello");
//! let data = writer.flush();
//!
//! // Read it back
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.u8().unwrap(), 0x01);
//! assert_eq!(reader.u16().unwrap(), 0x0203);
//! assert_eq!(reader.utf8(5).unwrap(), "hello");
//! ```

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    #[error("end of buffer: needed {needed} byte(s) at offset {offset}")]
    EndOfBuffer { offset: usize, needed: usize },
    /// Invalid UTF-8 sequence.
    #[error("invalid UTF-8 sequence at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

impl BufferError {
    /// Byte offset at which the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            BufferError::EndOfBuffer { offset, .. } => *offset,
            BufferError::InvalidUtf8 { offset } => *offset,
        }
    }
}
