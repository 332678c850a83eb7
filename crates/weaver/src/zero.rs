//! Zero values: the canonical default instance of a surface.

use tracing::debug;

use crate::codec::TupleCodec;
use crate::dynamic::{Args, Dyn};
use crate::error::{Result, WeaverError};
use crate::registry::{read, Weaver};
use crate::surface::{Primitive, Surface};

struct ZeroRule {
    applies: fn(&Weaver, &Surface) -> bool,
    build: fn(&Weaver, &Surface) -> Result<Dyn>,
}

/// Evaluated in order; the first rule that applies produces the zero.
const ZERO_RULES: &[ZeroRule] = &[
    // Registered.
    ZeroRule {
        applies: |w, s| read(&w.inner.zeros).contains_key(s.name()),
        build: |w, s| Ok(read(&w.inner.zeros).get(s.name()).cloned().unwrap_or_default()),
    },
    ZeroRule {
        applies: |_, s| s.is_primitive(),
        build: |_, s| Ok(s.primitive_kind().map(primitive_zero).unwrap_or_default()),
    },
    ZeroRule {
        applies: |_, s| s.is_array(),
        build: |_, s| s.construct(Args::default()),
    },
    ZeroRule {
        applies: |_, s| s.is_tuple(),
        build: |w, s| match s.type_args().len() {
            1 => Ok(Dyn::null()),
            arity if (2..=TupleCodec::MAX_ARITY).contains(&arity) => {
                let parts = s
                    .type_args()
                    .iter()
                    .map(|arg| w.zero_of(arg))
                    .collect::<Result<Vec<_>>>()?;
                s.construct(Args(parts))
            }
            arity => Err(WeaverError::UnsupportedArity {
                name: s.name().to_string(),
                arity,
            }),
        },
    },
    ZeroRule {
        applies: |_, s| s.is_option(),
        build: |_, s| s.construct(Args::default()),
    },
    ZeroRule {
        applies: |_, s| s.is_dynamic(),
        build: |_, _| Ok(Dyn::null()),
    },
    // Generic collections.
    ZeroRule {
        applies: |_, s| (s.is_seq() || s.is_map()) && !s.type_args().is_empty(),
        build: |_, s| s.construct(Args::default()),
    },
    ZeroRule {
        applies: |_, s| s.is_enum() && !s.variants().is_empty(),
        build: |_, s| Ok(s.variants()[0].value.clone()),
    },
    ZeroRule {
        applies: |_, s| s.is_record() && s.has_factory(),
        build: |w, s| {
            let args = s
                .params()
                .iter()
                .map(|param| match param.default() {
                    Some(default) => Ok(default.clone()),
                    None => w.zero_of(&param.surface()),
                })
                .collect::<Result<Vec<_>>>()?;
            s.construct(Args(args))
        },
    },
];

fn primitive_zero(primitive: Primitive) -> Dyn {
    match primitive {
        Primitive::Unit => Dyn::null(),
        Primitive::Bool => Dyn::new(false),
        Primitive::I8 => Dyn::new(0i8),
        Primitive::I16 => Dyn::new(0i16),
        Primitive::I32 => Dyn::new(0i32),
        Primitive::I64 => Dyn::new(0i64),
        Primitive::U8 => Dyn::new(0u8),
        Primitive::U16 => Dyn::new(0u16),
        Primitive::U32 => Dyn::new(0u32),
        Primitive::U64 => Dyn::new(0u64),
        Primitive::F32 => Dyn::new(0.0f32),
        Primitive::F64 => Dyn::new(0.0f64),
        Primitive::Char => Dyn::new('\0'),
        Primitive::String => Dyn::new(String::new()),
        Primitive::Binary => Dyn::new(Vec::<u8>::new()),
    }
}

impl Weaver {
    /// The zero value of `surface`.
    ///
    /// Unrecognized shapes yield the null marker rather than an error.
    pub fn zero_of(&self, surface: &Surface) -> Result<Dyn> {
        let surface = surface.dealias();
        for rule in ZERO_RULES {
            if (rule.applies)(self, &surface) {
                return (rule.build)(self, &surface);
            }
        }
        debug!(surface = surface.name(), "no zero rule applies, using null");
        Ok(Dyn::null())
    }
}
