//! Auto-growing binary buffer writer.

use std::io;

/// A binary buffer writer that appends big-endian data to a growable buffer.
///
/// # Example
///
/// ```
/// use weaver_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8u16(0xcd, 0x0102);
/// assert_eq!(writer.flush(), vec![0xcd, 0x01, 0x02]);
/// assert!(writer.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Writer {
    /// The underlying buffer.
    pub uint8: Vec<u8>,
}

impl Writer {
    /// Creates a new writer with default allocation size.
    pub fn new() -> Self {
        Self::with_alloc_size(64)
    }

    /// Creates a new writer with a custom initial allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(alloc_size),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Makes sure at least `capacity` more bytes fit without reallocating.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.uint8.reserve(capacity);
    }

    /// Discards everything written so far, keeping the allocation.
    pub fn reset(&mut self) {
        self.uint8.clear();
    }

    /// Returns the written bytes and resets the writer.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.uint8)
    }

    /// Borrows the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8
    }

    /// Consumes the writer, returning its buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.uint8
    }

    /// Copies the written bytes into an [`io::Write`] sink.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        sink.write_all(&self.uint8)
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.uint8.push(val as u8);
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i16(&mut self, val: i16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a tag byte followed by a big-endian `u8`.
    #[inline]
    pub fn u8u8(&mut self, tag: u8, val: u8) {
        self.uint8.extend_from_slice(&[tag, val]);
    }

    /// Writes a tag byte followed by a big-endian `u16`.
    #[inline]
    pub fn u8u16(&mut self, tag: u8, val: u16) {
        self.u8(tag);
        self.u16(val);
    }

    /// Writes a tag byte followed by a big-endian `u32`.
    #[inline]
    pub fn u8u32(&mut self, tag: u8, val: u32) {
        self.u8(tag);
        self.u32(val);
    }

    /// Writes a tag byte followed by a big-endian `u64`.
    #[inline]
    pub fn u8u64(&mut self, tag: u8, val: u64) {
        self.u8(tag);
        self.u64(val);
    }

    /// Writes a tag byte followed by a big-endian `f32`.
    #[inline]
    pub fn u8f32(&mut self, tag: u8, val: f32) {
        self.u8(tag);
        self.f32(val);
    }

    /// Writes a tag byte followed by a big-endian `f64`.
    #[inline]
    pub fn u8f64(&mut self, tag: u8, val: f64) {
        self.u8(tag);
        self.f64(val);
    }

    /// Appends raw bytes verbatim.
    #[inline]
    pub fn buf(&mut self, bytes: &[u8]) {
        self.uint8.extend_from_slice(bytes);
    }

    /// Appends the UTF-8 bytes of a string.
    #[inline]
    pub fn utf8(&mut self, s: &str) {
        self.uint8.extend_from_slice(s.as_bytes());
    }
}
