//! The codec registry.
//!
//! A [`Weaver`] maps surfaces to codecs. Codecs for containers, tuples,
//! enums and records are derived on first request by walking [`RULES`] top
//! to bottom and are then cached for the life of the registry. Derivation
//! failures are cached too, so an unsupported type is only inspected once.
//!
//! Registering a codec bumps a generation counter and empties both caches. A
//! derivation that overlapped a registration is returned to its caller but
//! never cached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};
use weaver_msgpack::json::{json_to_msgpack, msgpack_to_json_with};
use weaver_msgpack::{Packer, RawMsgPack, Unpacker};

use crate::codec::{
    unpack_one, AnyCodec, DateTimeCodec, DurationCodec, EnumCodec, LazyCodec, MapCodec,
    MessageCodec, NaiveDateCodec, OptionCodec, PrimitiveCodec, RawCodec, RecordCodec, SeqCodec,
    TupleCodec,
};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};
use crate::surface::{Data, HasSurface, Surface};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub(crate) struct Inner {
    registered: RwLock<HashMap<String, Arc<dyn MessageCodec>>>,
    derived: RwLock<HashMap<String, Arc<dyn MessageCodec>>>,
    failures: RwLock<HashMap<String, WeaverError>>,
    pub(crate) zeros: RwLock<HashMap<String, Dyn>>,
    /// Bumped by every codec registration.
    generation: AtomicU64,
}

/// Codec registry and zero-value source.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct Weaver {
    pub(crate) inner: Arc<Inner>,
}

/// Non-owning handle held by codecs that call back into their registry.
#[derive(Clone)]
pub(crate) struct WeakWeaver(Weak<Inner>);

impl WeakWeaver {
    pub(crate) fn upgrade(&self) -> Result<Weaver> {
        self.0
            .upgrade()
            .map(|inner| Weaver { inner })
            .ok_or_else(|| WeaverError::IllegalArgument("codec registry was dropped".into()))
    }
}

static GLOBAL: OnceLock<Weaver> = OnceLock::new();

thread_local! {
    static RESOLVING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks a surface as being derived on this thread until dropped.
struct Resolving;

impl Resolving {
    fn enter(name: &str) -> Option<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|n| n == name) {
                return None;
            }
            stack.push(name.to_string());
            Some(Resolving)
        })
    }
}

impl Drop for Resolving {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

type Build = fn(&Weaver, &Surface) -> Result<Arc<dyn MessageCodec>>;

struct Rule {
    name: &'static str,
    applies: fn(&Weaver, &Surface) -> bool,
    build: Build,
}

/// Derivation rules; the first one that applies builds the codec.
const RULES: &[Rule] = &[
    Rule {
        name: "registered",
        applies: |w, s| read(&w.inner.registered).contains_key(s.name()),
        build: |w, s| {
            read(&w.inner.registered)
                .get(s.name())
                .cloned()
                .ok_or_else(|| WeaverError::UnsupportedType(s.name().to_string()))
        },
    },
    Rule {
        name: "primitive",
        applies: |_, s| s.is_primitive(),
        build: |_, s| match s.primitive_kind() {
            Some(primitive) => Ok(Arc::new(PrimitiveCodec::new(primitive))),
            None => Err(WeaverError::UnsupportedType(s.name().to_string())),
        },
    },
    Rule {
        name: "option",
        applies: |_, s| s.is_option(),
        build: |w, s| {
            let inner = w.resolve(type_arg(s, 0)?)?;
            Ok(Arc::new(OptionCodec::new(s.clone(), inner)))
        },
    },
    Rule {
        name: "collection",
        applies: |_, s| s.is_seq() || s.is_array() || s.is_map(),
        build: |w, s| {
            let first = w.resolve(type_arg(s, 0)?)?;
            if s.is_map() {
                let value = w.resolve(type_arg(s, 1)?)?;
                return Ok(Arc::new(MapCodec::new(s.clone(), first, value)));
            }
            Ok(Arc::new(SeqCodec::new(s.clone(), first)))
        },
    },
    Rule {
        name: "tuple",
        applies: |_, s| s.is_tuple(),
        build: |w, s| {
            let arity = s.type_args().len();
            if !(1..=TupleCodec::MAX_ARITY).contains(&arity) {
                return Err(WeaverError::UnsupportedArity {
                    name: s.name().to_string(),
                    arity,
                });
            }
            let elements = s
                .type_args()
                .iter()
                .map(|arg| w.resolve(arg))
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(TupleCodec::new(s.clone(), elements)))
        },
    },
    Rule {
        name: "enum",
        applies: |_, s| s.is_enum(),
        build: |_, s| Ok(Arc::new(EnumCodec::new(s.clone()))),
    },
    Rule {
        name: "any",
        applies: |_, s| s.is_dynamic(),
        build: |_, _| Ok(Arc::new(AnyCodec)),
    },
    Rule {
        name: "record",
        applies: |_, s| s.is_record() && s.has_factory(),
        build: |w, s| Ok(Arc::new(RecordCodec::new(w, s)?)),
    },
];

fn type_arg(surface: &Surface, index: usize) -> Result<&Surface> {
    surface.type_args().get(index).ok_or_else(|| {
        WeaverError::UnsupportedType(format!("{surface} is missing type argument {index}"))
    })
}

impl Weaver {
    /// A registry with the built-in time and raw codecs and their zeros.
    pub fn new() -> Self {
        let weaver = Weaver {
            inner: Arc::new(Inner::default()),
        };
        {
            let mut registered = write(&weaver.inner.registered);
            let builtins: [(Surface, Arc<dyn MessageCodec>); 4] = [
                (Surface::of::<Duration>(), Arc::new(DurationCodec)),
                (Surface::of::<DateTime<Utc>>(), Arc::new(DateTimeCodec)),
                (Surface::of::<NaiveDate>(), Arc::new(NaiveDateCodec)),
                (Surface::of::<RawMsgPack>(), Arc::new(RawCodec)),
            ];
            for (surface, codec) in builtins {
                registered.insert(surface.name().to_string(), codec);
            }
        }
        {
            let mut zeros = write(&weaver.inner.zeros);
            let builtins = [
                (Surface::of::<Duration>(), Dyn::new(Duration::ZERO)),
                (Surface::of::<DateTime<Utc>>(), Dyn::new(DateTime::<Utc>::default())),
                (Surface::of::<NaiveDate>(), Dyn::new(NaiveDate::default())),
                (Surface::of::<RawMsgPack>(), Dyn::new(RawMsgPack { bytes: vec![0xc0] })),
            ];
            for (surface, zero) in builtins {
                zeros.insert(surface.name().to_string(), zero);
            }
        }
        weaver
    }

    /// The process-wide registry behind the free functions of this crate.
    pub fn global() -> &'static Weaver {
        GLOBAL.get_or_init(Weaver::new)
    }

    pub(crate) fn downgrade(&self) -> WeakWeaver {
        WeakWeaver(Arc::downgrade(&self.inner))
    }

    /// Returns the codec for `surface`, deriving and caching it on first use.
    pub fn resolve(&self, surface: &Surface) -> Result<Arc<dyn MessageCodec>> {
        let surface = surface.dealias();
        let name = surface.name();
        if let Some(codec) = read(&self.inner.derived).get(name) {
            return Ok(codec.clone());
        }
        if let Some(err) = read(&self.inner.failures).get(name) {
            debug!(surface = name, %err, "codec derivation failed before");
            return Err(err.clone());
        }
        let Some(_resolving) = Resolving::enter(name) else {
            // Recursive type: the codec being built refers back to itself.
            return Ok(Arc::new(LazyCodec::new(self.downgrade(), surface.clone())));
        };
        let generation = self.inner.generation.load(Ordering::SeqCst);
        match self.derive(&surface) {
            Ok(codec) => {
                let mut derived = write(&self.inner.derived);
                if self.is_stale(generation) {
                    return Ok(codec);
                }
                Ok(derived.entry(name.to_string()).or_insert(codec).clone())
            }
            Err(err) => {
                warn!(surface = name, %err, "cannot derive codec");
                let mut failures = write(&self.inner.failures);
                if self.is_stale(generation) {
                    return Err(err);
                }
                Err(failures.entry(name.to_string()).or_insert(err).clone())
            }
        }
    }

    /// Whether a codec was registered since `generation` was read. Must be
    /// called with the cache's write lock held.
    fn is_stale(&self, generation: u64) -> bool {
        let stale = self.inner.generation.load(Ordering::SeqCst) != generation;
        if stale {
            debug!(generation, "registry changed during derivation, not caching");
        }
        stale
    }

    fn derive(&self, surface: &Surface) -> Result<Arc<dyn MessageCodec>> {
        for rule in RULES {
            if (rule.applies)(self, surface) {
                debug!(surface = surface.name(), rule = rule.name, "deriving codec");
                return (rule.build)(self, surface);
            }
        }
        Err(WeaverError::UnsupportedType(surface.name().to_string()))
    }

    /// Installs `codec` for `surface`, replacing any earlier registration.
    ///
    /// Derived codecs and remembered failures are dropped so later
    /// derivations pick up the new codec.
    pub fn register_codec<C: MessageCodec + 'static>(&self, surface: &Surface, codec: C) {
        let surface = surface.dealias();
        write(&self.inner.registered).insert(surface.name().to_string(), Arc::new(codec));
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        write(&self.inner.derived).clear();
        write(&self.inner.failures).clear();
        debug!(surface = surface.name(), "registered codec");
    }

    /// Installs the zero value of `surface`, replacing any earlier one.
    pub fn register_zero<V: Data>(&self, surface: &Surface, zero: V) {
        let surface = surface.dealias();
        write(&self.inner.zeros).insert(surface.name().to_string(), Dyn::new(zero));
        debug!(surface = surface.name(), "registered zero");
    }

    pub fn pack(&self, value: &Dyn, surface: &Surface) -> Result<Vec<u8>> {
        self.pack_with(value, surface, &WeaverConfig::default())
    }

    pub fn pack_with(
        &self,
        value: &Dyn,
        surface: &Surface,
        config: &WeaverConfig,
    ) -> Result<Vec<u8>> {
        let codec = self.resolve(surface)?;
        let mut packer = Packer::new();
        codec.pack(value, &mut packer, config)?;
        Ok(packer.into_bytes())
    }

    /// Decodes the first value in `bytes`; anything after it is ignored.
    pub fn unpack(&self, bytes: &[u8], surface: &Surface) -> Result<Dyn> {
        self.unpack_with(bytes, surface, &WeaverConfig::default())
    }

    pub fn unpack_with(&self, bytes: &[u8], surface: &Surface, config: &WeaverConfig) -> Result<Dyn> {
        let codec = self.resolve(surface)?;
        let mut unpacker = Unpacker::new(bytes).with_strict_utf8(config.strict_utf8);
        let mut ctx = WeaverContext::new(*config);
        unpack_one(codec.as_ref(), &mut unpacker, &mut ctx)
    }

    pub fn to_json(&self, value: &Dyn, surface: &Surface) -> Result<String> {
        self.to_json_with(value, surface, &WeaverConfig::default())
    }

    /// Packs `value`, then renders the bytes as JSON.
    pub fn to_json_with(
        &self,
        value: &Dyn,
        surface: &Surface,
        config: &WeaverConfig,
    ) -> Result<String> {
        let bytes = self.pack_with(value, surface, config)?;
        let mut unpacker = Unpacker::new(&bytes).with_strict_utf8(config.strict_utf8);
        Ok(msgpack_to_json_with(&mut unpacker, config.json)?)
    }

    pub fn from_json(&self, text: &str, surface: &Surface) -> Result<Dyn> {
        self.from_json_with(text, surface, &WeaverConfig::default())
    }

    /// Transcodes JSON text to MessagePack, then unpacks it.
    pub fn from_json_with(
        &self,
        text: &str,
        surface: &Surface,
        config: &WeaverConfig,
    ) -> Result<Dyn> {
        let bytes = json_to_msgpack(text)?;
        self.unpack_with(&bytes, surface, config)
    }

    pub fn pack_as<T: HasSurface>(&self, value: &T) -> Result<Vec<u8>> {
        self.pack(&Dyn::new(value.clone()), &Surface::of::<T>())
    }

    pub fn unpack_as<T: HasSurface>(&self, bytes: &[u8]) -> Result<T> {
        self.unpack(bytes, &Surface::of::<T>())?.take::<T>()
    }

    pub fn to_json_as<T: HasSurface>(&self, value: &T) -> Result<String> {
        self.to_json(&Dyn::new(value.clone()), &Surface::of::<T>())
    }

    pub fn from_json_as<T: HasSurface>(&self, text: &str) -> Result<T> {
        self.from_json(text, &Surface::of::<T>())?.take::<T>()
    }

    pub fn zero_as<T: HasSurface>(&self) -> Result<T> {
        self.zero_of(&Surface::of::<T>())?.take::<T>()
    }
}

impl Default for Weaver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weaver")
            .field("registered", &read(&self.inner.registered).len())
            .field("derived", &read(&self.inner.derived).len())
            .field("failures", &read(&self.inner.failures).len())
            .field("zeros", &read(&self.inner.zeros).len())
            .finish()
    }
}
