//! Record, enum and registry behavior through the public API.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use weaver::msgpack::{Packer, Unpacker, Value, ValueKind};
use weaver::{
    Args, Dyn, HasSurface, MessageCodec, Param, Shape, Surface, Weaver, WeaverConfig,
    WeaverContext, WeaverError,
};

#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    host: String,
    port: u16,
    tags: Vec<String>,
    timeout: Duration,
    password: Option<String>,
}

impl HasSurface for ServerConfig {
    fn surface() -> Surface {
        Surface::record::<ServerConfig>()
            .field("host", |c: &ServerConfig| c.host.clone())
            .param(
                Param::of::<u16>("port")
                    .default_value(8080u16)
                    .accessor(|c: &ServerConfig| c.port),
            )
            .field("tags", |c: &ServerConfig| c.tags.clone())
            .field("timeout", |c: &ServerConfig| c.timeout)
            .param(
                Param::of::<Option<String>>("password")
                    .optional()
                    .secret()
                    .accessor(|c: &ServerConfig| c.password.clone()),
            )
            .factory(|args: Args| {
                Ok(ServerConfig {
                    host: args.get(0)?,
                    port: args.get(1)?,
                    tags: args.get(2)?,
                    timeout: args.get(3)?,
                    password: args.get(4)?,
                })
            })
            .build()
    }
}

fn sample() -> ServerConfig {
    ServerConfig {
        host: "example.org".into(),
        port: 443,
        tags: vec!["edge".into(), "eu".into()],
        timeout: Duration::from_secs(5),
        password: Some("hunter2".into()),
    }
}

#[test]
fn records_pack_as_maps_in_declaration_order() {
    let json = weaver::to_json_as(&sample()).unwrap();
    assert_eq!(
        json,
        r#"{"host":"example.org","port":443,"tags":["edge","eu"],"timeout":"PT5S","password":"hunter2"}"#
    );
    assert_eq!(weaver::from_json_as::<ServerConfig>(&json).unwrap(), sample());
}

#[test]
fn record_json_is_standard_json() {
    let json = weaver::to_json_as(&sample()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["port"], 443);
    assert_eq!(parsed["tags"][1], "eu");
    assert_eq!(parsed["timeout"], "PT5S");
    let keys: Vec<&str> = parsed.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["host", "port", "tags", "timeout", "password"]);
}

#[test]
fn records_round_trip_through_msgpack() {
    let bytes = weaver::pack_as(&sample()).unwrap();
    assert_eq!(bytes[0], 0x85);
    assert_eq!(weaver::unpack_as::<ServerConfig>(&bytes).unwrap(), sample());
}

#[test]
fn missing_fields_take_defaults_then_zeros() {
    let config: ServerConfig = weaver::from_json_as(r#"{"host":"a"}"#).unwrap();
    assert_eq!(
        config,
        ServerConfig {
            host: "a".into(),
            port: 8080,
            tags: vec![],
            timeout: Duration::ZERO,
            password: None,
        }
    );
}

#[test]
fn keys_match_loosely_and_unknown_keys_are_skipped() {
    let json = r#"{"HOST":"h","extra":{"deep":[1,2,{"x":null}]},"Port":1,"time-out":"PT1M","tags":null}"#;
    let config: ServerConfig = weaver::from_json_as(json).unwrap();
    assert_eq!(config.host, "h");
    assert_eq!(config.port, 1);
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert!(config.tags.is_empty());
}

#[test]
fn later_duplicate_keys_win() {
    let config: ServerConfig = weaver::from_json_as(r#"{"port":1,"port":2}"#).unwrap();
    assert_eq!(config.port, 2);
}

#[derive(Debug, Clone, PartialEq)]
struct Ids {
    user_id: i64,
    userid: i64,
}

impl HasSurface for Ids {
    fn surface() -> Surface {
        Surface::record::<Ids>()
            .field("user_id", |r: &Ids| r.user_id)
            .field("userid", |r: &Ids| r.userid)
            .factory(|args: Args| {
                Ok(Ids {
                    user_id: args.get(0)?,
                    userid: args.get(1)?,
                })
            })
            .build()
    }
}

#[test]
fn exact_field_names_beat_loose_matches() {
    let ids = Ids {
        user_id: 1,
        userid: 2,
    };
    let bytes = weaver::pack_as(&ids).unwrap();
    assert_eq!(weaver::unpack_as::<Ids>(&bytes).unwrap(), ids);
    let json = weaver::to_json_as(&ids).unwrap();
    assert_eq!(json, r#"{"user_id":1,"userid":2}"#);
    assert_eq!(weaver::from_json_as::<Ids>(&json).unwrap(), ids);

    // Colliding names are not guessed at.
    let loose: Ids = weaver::from_json_as(r#"{"USER-ID":5,"userid":2}"#).unwrap();
    assert_eq!(loose, Ids { user_id: 0, userid: 2 });
}

#[test]
fn records_accept_positional_arrays() {
    let config: ServerConfig = weaver::from_json_as(r#"["h",81,["a"]]"#).unwrap();
    assert_eq!(config.host, "h");
    assert_eq!(config.port, 81);
    assert_eq!(config.tags, vec!["a".to_string()]);
    assert_eq!(config.timeout, Duration::ZERO);

    let extra: ServerConfig =
        weaver::from_json_as(r#"["h",81,[],"PT1S",null,"ignored"]"#).unwrap();
    assert_eq!(extra.timeout, Duration::from_secs(1));
}

#[test]
fn null_record_is_all_defaults() {
    let config: ServerConfig = weaver::from_json_as("null").unwrap();
    assert_eq!(config, weaver::zero::<ServerConfig>().unwrap());
    assert_eq!(config.port, 8080);
}

#[test]
fn records_reject_scalars() {
    let err = weaver::from_json_as::<ServerConfig>("42").unwrap_err();
    assert!(matches!(
        err,
        WeaverError::MsgPack(weaver::msgpack::MsgPackError::TypeMismatch {
            expected: ValueKind::Map,
            actual: ValueKind::Int
        })
    ));
}

#[test]
fn required_fields_can_be_enforced() {
    let weaver = Weaver::new();
    let strict = WeaverConfig::default().with_require_fields(true);
    let surface = Surface::of::<ServerConfig>();

    let err = weaver
        .from_json_with(r#"{"port":1}"#, &surface, &strict)
        .unwrap_err();
    assert!(matches!(err, WeaverError::MissingField { ref field, .. } if field == "host"));

    // Optional parameters and parameters with defaults still fill in.
    let ok = weaver
        .from_json_with(r#"{"host":"h","tags":[],"timeout":"PT0S"}"#, &surface, &strict)
        .unwrap()
        .take::<ServerConfig>()
        .unwrap();
    assert_eq!(ok.port, 8080);
    assert_eq!(ok.password, None);
}

#[test]
fn param_flags_are_visible_on_the_surface() {
    let surface = Surface::of::<ServerConfig>();
    let names: Vec<&str> = surface.params().iter().map(|p| p.name()).collect();
    assert_eq!(names, ["host", "port", "tags", "timeout", "password"]);
    let password = &surface.params()[4];
    assert!(password.is_secret());
    assert!(!password.is_required());
    assert_eq!(surface.params()[1].default(), Some(&Dyn::new(8080u16)));
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    Red,
    Green,
    Blue,
}

impl HasSurface for Color {
    fn surface() -> Surface {
        Surface::enumeration::<Color>()
            .variant("Red", Color::Red)
            .variant("Green", Color::Green)
            .variant("Blue", Color::Blue)
            .build()
    }
}

#[test]
fn enums_use_variant_names() {
    assert_eq!(weaver::to_json_as(&Color::Green).unwrap(), "\"Green\"");
    assert_eq!(weaver::from_json_as::<Color>("\"blue\"").unwrap(), Color::Blue);
    assert!(matches!(
        weaver::from_json_as::<Color>("\"purple\""),
        Err(WeaverError::IllegalArgument(_))
    ));
    assert_eq!(weaver::zero::<Color>().unwrap(), Color::Red);
    assert_eq!(
        weaver::to_json_as(&vec![Color::Blue, Color::Red]).unwrap(),
        r#"["Blue","Red"]"#
    );
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    value: i64,
    children: Vec<Tree>,
}

impl HasSurface for Tree {
    fn surface() -> Surface {
        Surface::record::<Tree>()
            .field("value", |t: &Tree| t.value)
            .field("children", |t: &Tree| t.children.clone())
            .factory(|args: Args| {
                Ok(Tree {
                    value: args.get(0)?,
                    children: args.get(1)?,
                })
            })
            .build()
    }
}

fn leaf(value: i64) -> Tree {
    Tree {
        value,
        children: vec![],
    }
}

#[test]
fn recursive_records_round_trip() {
    let tree = Tree {
        value: 1,
        children: vec![
            leaf(2),
            Tree {
                value: 3,
                children: vec![leaf(4), leaf(5)],
            },
        ],
    };
    let weaver = Weaver::new();
    let bytes = weaver.pack_as(&tree).unwrap();
    assert_eq!(weaver.unpack_as::<Tree>(&bytes).unwrap(), tree);
    assert_eq!(
        weaver.to_json_as(&leaf(7)).unwrap(),
        r#"{"value":7,"children":[]}"#
    );
    assert_eq!(weaver.zero_as::<Tree>().unwrap(), leaf(0));
}

#[test]
fn deeply_nested_records_are_rejected() {
    let mut bytes = Vec::new();
    for _ in 0..100_000 {
        bytes.extend_from_slice(&[0x92, 0x00, 0x91]);
    }
    bytes.push(0xc0);
    let err = weaver::unpack_as::<Tree>(&bytes).unwrap_err();
    assert!(matches!(
        err,
        WeaverError::MsgPack(weaver::msgpack::MsgPackError::DepthExceeded { .. })
    ));

    // Each level is a record plus its children array.
    let mut shallow = Vec::new();
    for _ in 0..100 {
        shallow.extend_from_slice(&[0x92, 0x00, 0x91]);
    }
    shallow.push(0xc0);
    let mut tree = weaver::unpack_as::<Tree>(&shallow).unwrap();
    let mut depth = 0;
    while let Some(child) = tree.children.pop() {
        tree = child;
        depth += 1;
    }
    assert_eq!(depth, 100);
}

#[derive(Debug, Clone, PartialEq)]
struct Celsius(f64);

impl HasSurface for Celsius {
    fn surface() -> Surface {
        Surface::builder("records::Celsius", Shape::Opaque).build()
    }
}

/// Packs a temperature as text like `21.5C`.
struct CelsiusCodec;

impl MessageCodec for CelsiusCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> weaver::Result<()> {
        let celsius = value
            .downcast_ref::<Celsius>()
            .ok_or_else(|| WeaverError::IllegalArgument("not a Celsius".into()))?;
        p.pack_str(&format!("{}C", celsius.0))?;
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> weaver::Result<()> {
        let text = u.unpack_str()?;
        let degrees = text
            .strip_suffix('C')
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| WeaverError::IllegalArgument(format!("bad temperature {text}")))?;
        ctx.set_object(Celsius(degrees));
        Ok(())
    }
}

#[test]
fn registered_codecs_take_precedence_and_clear_failures() {
    let weaver = Weaver::new();
    let readings = Surface::of::<Vec<Celsius>>();
    assert!(matches!(
        weaver.resolve(&readings),
        Err(WeaverError::UnsupportedType(_))
    ));

    weaver.register_codec(&Surface::of::<Celsius>(), CelsiusCodec);
    let json = weaver
        .to_json_as(&vec![Celsius(21.5), Celsius(-3.0)])
        .unwrap();
    assert_eq!(json, r#"["21.5C","-3C"]"#);
    assert_eq!(
        weaver.from_json_as::<Vec<Celsius>>(&json).unwrap(),
        vec![Celsius(21.5), Celsius(-3.0)]
    );
}

#[test]
fn registration_replaces_derived_codecs() {
    struct Shouting;

    impl MessageCodec for Shouting {
        fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> weaver::Result<()> {
            let text = value.downcast_ref::<String>().cloned().unwrap_or_default();
            p.pack_str(&text.to_uppercase())?;
            Ok(())
        }

        fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> weaver::Result<()> {
            let text = u.unpack_str()?.to_lowercase();
            ctx.set_str(text);
            Ok(())
        }
    }

    let weaver = Weaver::new();
    let before = weaver.resolve(&Surface::of::<String>()).unwrap();
    weaver.register_codec(&Surface::of::<String>(), Shouting);
    let after = weaver.resolve(&Surface::of::<String>()).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(weaver.to_json_as(&"hi".to_string()).unwrap(), "\"HI\"");
    assert_eq!(weaver.to_json_as(&leaf(1)).unwrap(), r#"{"value":1,"children":[]}"#);

    // The global registry is untouched.
    assert_eq!(weaver::to_json_as(&"hi".to_string()).unwrap(), "\"hi\"");
}

#[test]
fn registration_during_concurrent_resolution_is_not_lost() {
    struct Doubled;

    impl MessageCodec for Doubled {
        fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> weaver::Result<()> {
            let text = value.downcast_ref::<String>().cloned().unwrap_or_default();
            p.pack_str(&text.repeat(2))?;
            Ok(())
        }

        fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> weaver::Result<()> {
            let text = u.unpack_str()?.into_owned();
            ctx.set_str(text);
            Ok(())
        }
    }

    for _ in 0..20 {
        let weaver = Weaver::new();
        let barrier = Barrier::new(5);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    barrier.wait();
                    for _ in 0..50 {
                        weaver.resolve(&Surface::of::<Vec<String>>()).unwrap();
                        weaver.resolve(&Surface::of::<(String, i64)>()).unwrap();
                    }
                });
            }
            barrier.wait();
            weaver.register_codec(&Surface::of::<String>(), Doubled);
        });
        assert_eq!(
            weaver.to_json_as(&vec!["ab".to_string()]).unwrap(),
            r#"["abab"]"#
        );
        assert_eq!(
            weaver.to_json_as(&("ab".to_string(), 1i64)).unwrap(),
            r#"["abab",1]"#
        );
    }
}

#[test]
fn registered_zeros_feed_missing_fields() {
    let weaver = Weaver::new();
    weaver.register_zero(&Surface::of::<Duration>(), Duration::from_secs(30));
    weaver.register_zero(&Surface::of::<u16>(), 1u16);

    assert_eq!(weaver.zero_as::<Duration>().unwrap(), Duration::from_secs(30));
    let config = weaver
        .from_json_as::<ServerConfig>(r#"{"host":"h"}"#)
        .unwrap();
    assert_eq!(config.timeout, Duration::from_secs(30));
    // A declared default still beats a registered zero.
    assert_eq!(config.port, 8080);
}

#[test]
fn aliases_share_their_target_codec() {
    let weaver = Weaver::new();
    let port = Surface::alias("records::Port", Surface::of::<u16>());
    let port_of_port = Surface::alias("records::PortAlias", port.clone());
    assert!(Arc::ptr_eq(
        &weaver.resolve(&port_of_port).unwrap(),
        &weaver.resolve(&Surface::of::<u16>()).unwrap()
    ));
    let bytes = weaver.pack(&Dyn::new(443u16), &port).unwrap();
    assert_eq!(weaver.unpack(&bytes, &port_of_port).unwrap(), Dyn::new(443u16));
    assert_eq!(weaver.zero_of(&port).unwrap(), Dyn::new(0u16));
}

#[test]
fn raw_msgpack_passes_through_records() {
    #[derive(Debug, Clone, PartialEq)]
    struct Envelope {
        kind: String,
        body: weaver::msgpack::RawMsgPack,
    }

    impl HasSurface for Envelope {
        fn surface() -> Surface {
            Surface::record::<Envelope>()
                .field("kind", |e: &Envelope| e.kind.clone())
                .field("body", |e: &Envelope| e.body.clone())
                .factory(|args: Args| {
                    Ok(Envelope {
                        kind: args.get(0)?,
                        body: args.get(1)?,
                    })
                })
                .build()
        }
    }

    let json = r#"{"kind":"ping","body":{"seq":[1,2,3]}}"#;
    let envelope: Envelope = weaver::from_json_as(json).unwrap();
    assert_eq!(
        envelope.body.to_value().unwrap().get("seq"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
    assert_eq!(weaver::to_json_as(&envelope).unwrap(), json);

    let empty: Envelope = weaver::from_json_as(r#"{"kind":"none"}"#).unwrap();
    assert_eq!(empty.body.bytes, vec![0xc0]);
}
