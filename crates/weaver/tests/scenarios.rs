//! End-to-end behavior of the public API.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use weaver::msgpack::{ExtValue, MsgPackError, Timestamp, Value, ValueKind};
use weaver::{Args, Dyn, HasSurface, Param, Shape, Surface, Weaver, WeaverConfig, WeaverError};

#[derive(Debug, Clone, PartialEq)]
struct A {
    a: i64,
}

impl HasSurface for A {
    fn surface() -> Surface {
        Surface::record::<A>()
            .param(Param::of::<i64>("a").default_value(10i64).accessor(|x: &A| x.a))
            .factory(|args: Args| Ok(A { a: args.get(0)? }))
            .build()
    }
}

#[test]
fn pack_127_is_one_byte() {
    assert_eq!(weaver::pack_as(&127i64).unwrap(), vec![0x7f]);
}

#[test]
fn pack_128_is_two_bytes() {
    assert_eq!(weaver::pack_as(&128i64).unwrap(), vec![0xcc, 0x80]);
}

#[test]
fn map_order_survives_a_round_trip() {
    let value = Value::Map(vec![
        ("a".into(), Value::Int(1)),
        ("b".into(), Value::Int(2)),
    ]);
    let bytes = weaver::pack_as(&value).unwrap();
    let back: Value = weaver::unpack_as(&bytes).unwrap();
    let pairs: Vec<(&str, i64)> = back
        .as_map()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.as_str().unwrap(), v.as_i64().unwrap()))
        .collect();
    assert_eq!(pairs, vec![("a", 1), ("b", 2)]);
}

#[test]
fn zero_of_record_uses_declared_default() {
    assert_eq!(weaver::zero::<A>().unwrap(), A { a: 10 });
    assert_eq!(
        weaver::zero_of(&Surface::of::<A>()).unwrap(),
        Dyn::new(A { a: 10 })
    );
}

#[test]
fn duration_json_is_iso_8601() {
    let json = weaver::to_json_as(&Duration::from_secs(90)).unwrap();
    assert_eq!(json, "\"PT1M30S\"");
    let back: Duration = weaver::from_json_as(&json).unwrap();
    assert_eq!(back, Duration::from_secs(90));
}

#[test]
fn not_a_date_names_the_target_type() {
    let err = weaver::from_json_as::<DateTime<Utc>>("\"not-a-date\"").unwrap_err();
    match err {
        WeaverError::IllegalArgument(message) => {
            assert!(message.contains("not-a-date"), "{message}");
            assert!(message.contains("DateTime"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let err = weaver::from_json_as::<NaiveDate>("\"2024-13-01\"").unwrap_err();
    assert!(matches!(err, WeaverError::IllegalArgument(m) if m.contains("NaiveDate")));
}

#[test]
fn null_date_names_the_target_type() {
    let err = weaver::from_json_as::<DateTime<Utc>>("null").unwrap_err();
    assert!(matches!(err, WeaverError::IllegalArgument(m) if m.contains("null") && m.contains("DateTime")));
}

#[test]
fn date_times_round_trip_through_json() {
    let dt = Utc.with_ymd_and_hms(2020, 9, 13, 12, 26, 40).unwrap();
    let json = weaver::to_json_as(&dt).unwrap();
    assert_eq!(json, "\"2020-09-13T12:26:40Z\"");
    assert_eq!(weaver::from_json_as::<DateTime<Utc>>(&json).unwrap(), dt);

    let bytes = weaver::pack_as(&dt).unwrap();
    assert_eq!(bytes[0], 0xd6, "timestamp 32 layout");
    assert_eq!(weaver::unpack_as::<DateTime<Utc>>(&bytes).unwrap(), dt);
    assert_eq!(weaver::from_json_as::<DateTime<Utc>>("1600000000000").unwrap(), dt);
}

#[test]
fn naive_dates_are_plain_strings() {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(weaver::to_json_as(&date).unwrap(), "\"2024-02-29\"");
    assert_eq!(weaver::from_json_as::<NaiveDate>("\"2024-02-29\"").unwrap(), date);
    assert_eq!(weaver::zero::<NaiveDate>().unwrap(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
}

#[test]
fn json_round_trip_keeps_key_order() {
    let text = r#"{"zeta":[1,2.5,"x",null,true],"alpha":{"nested":false}}"#;
    let value: Value = weaver::from_json_as(text).unwrap();
    assert_eq!(weaver::to_json_as(&value).unwrap(), text);
}

#[test]
fn extension_json_rendering() {
    let ext = Value::Ext(ExtValue::new(5, vec![1, 2]));
    assert_eq!(weaver::to_json_as(&ext).unwrap(), r#"[5,"AQI="]"#);
    let ts = Value::timestamp(Timestamp::from_seconds(0));
    assert_eq!(weaver::to_json_as(&ts).unwrap(), r#""1970-01-01T00:00:00Z""#);
}

#[test]
fn options_tuples_and_maps() {
    assert_eq!(weaver::from_json_as::<Option<i64>>("null").unwrap(), None);
    assert_eq!(weaver::from_json_as::<Option<i64>>("5").unwrap(), Some(5));
    assert_eq!(weaver::to_json_as(&None::<String>).unwrap(), "null");

    let tuple = (1i64, "x".to_string(), true);
    assert_eq!(weaver::to_json_as(&tuple).unwrap(), r#"[1,"x",true]"#);
    assert_eq!(
        weaver::from_json_as::<(i64, String, bool)>(r#"[1,"x",true]"#).unwrap(),
        tuple
    );
    assert!(matches!(
        weaver::from_json_as::<(i64, String, bool)>("[1]"),
        Err(WeaverError::IllegalArgument(_))
    ));

    let mut by_id = BTreeMap::new();
    by_id.insert(1i64, "one".to_string());
    by_id.insert(2i64, "two".to_string());
    let json = weaver::to_json_as(&by_id).unwrap();
    assert_eq!(json, r#"{"1":"one","2":"two"}"#);
    assert_eq!(weaver::from_json_as::<BTreeMap<i64, String>>(&json).unwrap(), by_id);
}

#[test]
fn unsigned_64_bit_integers_survive_json() {
    for n in [u64::MAX, i64::MAX as u64 + 1, i64::MAX as u64] {
        let json = weaver::to_json_as(&n).unwrap();
        assert_eq!(json, n.to_string());
        assert_eq!(weaver::from_json_as::<u64>(&json).unwrap(), n);
    }
    let value: Value = weaver::from_json_as("[18446744073709551615]").unwrap();
    assert_eq!(value, Value::Array(vec![Value::UInt(u64::MAX)]));
    assert_eq!(weaver::to_json_as(&value).unwrap(), "[18446744073709551615]");
    assert!(weaver::from_json_as::<i64>("9223372036854775808").is_err());
}

#[test]
fn nil_decodes_to_empty_collections() {
    assert!(weaver::from_json_as::<Vec<String>>("null").unwrap().is_empty());
    assert!(weaver::from_json_as::<BTreeMap<String, u8>>("null").unwrap().is_empty());
}

#[test]
fn primitive_coercions_through_json() {
    assert_eq!(weaver::from_json_as::<i32>("\"42\"").unwrap(), 42);
    assert_eq!(weaver::from_json_as::<String>("12").unwrap(), "12");
    assert_eq!(weaver::from_json_as::<f64>("3").unwrap(), 3.0);
    assert!(weaver::from_json_as::<bool>("\"true\"").unwrap());
    assert_eq!(
        weaver::from_json_as::<i64>("[]").unwrap_err(),
        WeaverError::MsgPack(MsgPackError::TypeMismatch {
            expected: ValueKind::Int,
            actual: ValueKind::Array
        })
    );
}

#[test]
fn malformed_json_reports_offset() {
    let err = weaver::from_json_as::<Value>("[1,,2]").unwrap_err();
    assert!(matches!(
        err,
        WeaverError::Json(weaver::msgpack::json::JsonError::Parse { offset: 3, .. })
    ));
}

#[test]
fn truncated_input_aborts_the_call() {
    let bytes = weaver::pack_as(&vec!["abc".to_string(), "def".to_string()]).unwrap();
    let err = weaver::unpack_as::<Vec<String>>(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, WeaverError::MsgPack(MsgPackError::InputTruncated { .. })));
}

#[test]
fn hostile_nesting_fails_cleanly() {
    let mut bytes = vec![0x91; 1_000_000];
    bytes.push(0xc0);
    let too_deep = |err: WeaverError| {
        matches!(err, WeaverError::MsgPack(MsgPackError::DepthExceeded { .. }))
    };
    assert!(too_deep(weaver::unpack_as::<Value>(&bytes).unwrap_err()));
    assert!(too_deep(weaver::unpack_as::<Vec<Value>>(&bytes).unwrap_err()));
    assert!(too_deep(weaver::unpack_as::<Vec<Dyn>>(&bytes).unwrap_err()));
}

#[test]
fn utf8_strictness_is_configurable() {
    let bytes = [0xa2, 0xff, b'a'];
    let weaver = Weaver::new();
    let surface = Surface::of::<String>();
    assert!(matches!(
        weaver.unpack(&bytes, &surface),
        Err(WeaverError::MsgPack(MsgPackError::InvalidString { .. }))
    ));
    let lenient = WeaverConfig::default().with_strict_utf8(false);
    let text = weaver.unpack_with(&bytes, &surface, &lenient).unwrap();
    assert_eq!(text.take::<String>().unwrap(), "\u{fffd}a");
}

#[test]
fn non_finite_floats_follow_json_options() {
    let weaver = Weaver::new();
    let surface = Surface::of::<f64>();
    let nan = Dyn::new(f64::NAN);
    assert_eq!(weaver.to_json(&nan, &surface).unwrap(), "null");
    let config = WeaverConfig::default()
        .with_json(weaver::msgpack::json::JsonOptions::default().with_non_finite_as_string(true));
    assert_eq!(weaver.to_json_with(&nan, &surface, &config).unwrap(), "\"NaN\"");
}

#[test]
fn unsupported_types_fail_at_resolution() {
    let weaver = Weaver::new();
    let opaque = Surface::builder("scenarios::Opaque", Shape::Opaque).build();
    let err = weaver.pack(&Dyn::new(1u8), &opaque).unwrap_err();
    assert_eq!(err, WeaverError::UnsupportedType("scenarios::Opaque".into()));
    assert_eq!(weaver.unpack(&[0xc0], &opaque).unwrap_err(), err);
}

#[test]
fn trailing_bytes_are_ignored() {
    assert_eq!(weaver::unpack_as::<u8>(&[0x05, 0xc3]).unwrap(), 5);
}

#[test]
fn dynamic_values_pack_without_a_surface_of_their_own() {
    let items = vec![Dyn::new(1i64), Dyn::new("two".to_string()), Dyn::null()];
    assert_eq!(weaver::to_json_as(&items).unwrap(), r#"[1,"two",null]"#);
    let back: Vec<Dyn> = weaver::from_json_as(r#"[1,"two",null]"#).unwrap();
    assert_eq!(back[1], Dyn::new(Value::Str("two".into())));
}
