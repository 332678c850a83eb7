//! Writer/Reader roundtrip matrix for the buffers crate.

use proptest::prelude::*;
use weaver_buffers::{BufferError, Reader, Writer};

// ---------------------------------------------------------------------------
// Writer/Reader roundtrip matrix
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_i8() {
    let mut w = Writer::new();
    w.i8(i8::MIN);
    w.i8(-1);
    w.i8(0);
    w.i8(i8::MAX);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.i8().unwrap(), i8::MIN);
    assert_eq!(r.i8().unwrap(), -1);
    assert_eq!(r.i8().unwrap(), 0);
    assert_eq!(r.i8().unwrap(), i8::MAX);
}

#[test]
fn roundtrip_i16() {
    let mut w = Writer::new();
    w.i16(i16::MIN);
    w.i16(-1000);
    w.i16(i16::MAX);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.i16().unwrap(), i16::MIN);
    assert_eq!(r.i16().unwrap(), -1000);
    assert_eq!(r.i16().unwrap(), i16::MAX);
}

#[test]
fn roundtrip_i32() {
    let mut w = Writer::new();
    w.i32(i32::MIN);
    w.i32(-123456);
    w.i32(i32::MAX);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.i32().unwrap(), i32::MIN);
    assert_eq!(r.i32().unwrap(), -123456);
    assert_eq!(r.i32().unwrap(), i32::MAX);
}

#[test]
fn roundtrip_floats() {
    let mut w = Writer::new();
    w.f32(1.5);
    w.f32(f32::NEG_INFINITY);
    w.f64(-0.25);
    w.f64(f64::MAX);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.f32().unwrap(), 1.5);
    assert_eq!(r.f32().unwrap(), f32::NEG_INFINITY);
    assert_eq!(r.f64().unwrap(), -0.25);
    assert_eq!(r.f64().unwrap(), f64::MAX);
}

#[test]
fn roundtrip_u8f64_tag() {
    let mut w = Writer::new();
    w.u8f64(0xcb, 2.5);
    let data = w.flush();
    let mut r = Reader::new(&data);
    assert_eq!(r.u8().unwrap(), 0xcb);
    assert_eq!(r.f64().unwrap(), 2.5);
}

#[test]
fn reading_past_end_reports_offset() {
    let data = [0u8; 3];
    let mut r = Reader::new(&data);
    r.u16().unwrap();
    let err = r.u64().unwrap_err();
    assert_eq!(err, BufferError::EndOfBuffer { offset: 2, needed: 8 });
    assert_eq!(err.offset(), 2);
}

#[test]
fn buf_returns_borrowed_subslice() {
    let data = [1u8, 2, 3, 4, 5];
    let mut r = Reader::new(&data);
    r.skip(1).unwrap();
    assert_eq!(r.buf(3).unwrap(), &[2, 3, 4]);
    assert_eq!(r.size(), 1);
    assert!(r.buf(2).is_err());
}

proptest! {
    #[test]
    fn roundtrip_u64_any(values in proptest::collection::vec(any::<u64>(), 0..32)) {
        let mut w = Writer::new();
        for v in &values {
            w.u64(*v);
        }
        let data = w.flush();
        let mut r = Reader::new(&data);
        for v in &values {
            prop_assert_eq!(r.u64().unwrap(), *v);
        }
        prop_assert!(r.is_empty());
    }

    #[test]
    fn roundtrip_utf8_any(s in ".*") {
        let mut w = Writer::new();
        w.utf8(&s);
        let data = w.flush();
        let mut r = Reader::new(&data);
        prop_assert_eq!(r.utf8(s.len()).unwrap(), s.as_str());
    }
}
