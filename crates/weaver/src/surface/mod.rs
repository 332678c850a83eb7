//! Surfaces: immutable type descriptors.
//!
//! A [`Surface`] tells the registry and the zero synthesizer what a type
//! looks like (its [`Shape`], type arguments, fields or variants) and how to
//! take instances apart and put them back together. Surfaces are cheap to
//! clone and compare by full name.
//!
//! Types describe themselves through [`HasSurface`]; the standard library
//! implementations live in `std_impls`. Records and enums are declared with
//! [`Surface::record`] and [`Surface::enumeration`]:
//!
//! ```
//! use weaver::{Args, HasSurface, Param, Surface};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! impl HasSurface for Point {
//!     fn surface() -> Surface {
//!         Surface::record::<Point>()
//!             .field("x", |p: &Point| p.x)
//!             .param(Param::of::<i64>("y").default_value(7i64).accessor(|p: &Point| p.y))
//!             .factory(|args: Args| Ok(Point { x: args.get(0)?, y: args.get(1)? }))
//!             .build()
//!     }
//! }
//!
//! let surface = Surface::of::<Point>();
//! assert!(surface.is_record());
//! assert_eq!(surface.params().len(), 2);
//! ```

mod std_impls;

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::dynamic::{Args, Dyn};
use crate::error::{Result, WeaverError};

/// Values that can travel through a [`Dyn`].
pub trait Data: Any + Send + Sync + Clone + PartialEq + fmt::Debug {}

impl<T> Data for T where T: Any + Send + Sync + Clone + PartialEq + fmt::Debug {}

/// Supplies the descriptor of `Self`.
pub trait HasSurface: Data {
    fn surface() -> Surface;
}

/// Builds an instance from ordered constructor arguments.
pub type Factory = Arc<dyn Fn(Args) -> Result<Dyn> + Send + Sync>;
/// Splits a container instance into ordered parts. Maps alternate key and
/// value; options yield zero or one part.
pub type Deconstructor = Arc<dyn Fn(&Dyn) -> Result<Vec<Dyn>> + Send + Sync>;
/// Reads one field out of a record instance.
pub type Accessor = Arc<dyn Fn(&Dyn) -> Result<Dyn> + Send + Sync>;

/// Scalar kinds with a direct wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Binary,
}

impl Primitive {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Primitive::I8
                | Primitive::I16
                | Primitive::I32
                | Primitive::I64
                | Primitive::U8
                | Primitive::U16
                | Primitive::U32
                | Primitive::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }
}

/// Structural classification of a surface.
#[derive(Debug, Clone)]
pub enum Shape {
    Primitive(Primitive),
    Option,
    Seq,
    Set,
    /// Fixed-size storage such as `Box<[T]>`.
    Array,
    Map,
    Tuple,
    Enum,
    Record,
    Alias(Surface),
    /// Top type: any value at all.
    Any,
    /// Bottom type: no value.
    Nothing,
    /// Only handled by a registered codec.
    Opaque,
}

/// One enum variant: its name and the instance it stands for.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub value: Dyn,
}

#[derive(Clone)]
enum ParamSurface {
    Ready(Surface),
    Deferred(fn() -> Surface),
}

/// A record field or constructor parameter.
///
/// Typed params resolve their surface on first use, so a record may refer to
/// itself through a container field.
#[derive(Clone)]
pub struct Param {
    name: String,
    surface: ParamSurface,
    required: bool,
    secret: bool,
    default: Option<Dyn>,
    accessor: Option<Accessor>,
}

impl Param {
    /// A param whose surface is `Surface::of::<T>()`.
    pub fn of<T: HasSurface>(name: impl Into<String>) -> Self {
        Self::with_surface(name, ParamSurface::Deferred(Surface::of::<T>))
    }

    pub fn new(name: impl Into<String>, surface: Surface) -> Self {
        Self::with_surface(name, ParamSurface::Ready(surface))
    }

    fn with_surface(name: impl Into<String>, surface: ParamSurface) -> Self {
        Self {
            name: name.into(),
            surface,
            required: true,
            secret: false,
            default: None,
            accessor: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn default_value<V: Data>(mut self, value: V) -> Self {
        self.default = Some(Dyn::new(value));
        self
    }

    /// Sets the field reader from a typed closure over the record type `R`.
    pub fn accessor<R, V, F>(mut self, read: F) -> Self
    where
        R: Any,
        V: Data,
        F: Fn(&R) -> V + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(move |instance: &Dyn| {
            instance
                .downcast_ref::<R>()
                .map(|record| Dyn::new(read(record)))
                .ok_or_else(|| WeaverError::Downcast {
                    expected: any::type_name::<R>(),
                    actual: instance.type_name(),
                })
        }));
        self
    }

    pub fn raw_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surface(&self) -> Surface {
        match &self.surface {
            ParamSurface::Ready(surface) => surface.clone(),
            ParamSurface::Deferred(of) => of(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn default(&self) -> Option<&Dyn> {
        self.default.as_ref()
    }

    /// Reads this field out of `record`.
    pub fn get(&self, record: &Dyn) -> Result<Dyn> {
        match &self.accessor {
            Some(read) => read(record),
            None => Err(WeaverError::UnsupportedType(format!(
                "field `{}` of {} has no accessor",
                self.name,
                record.type_name()
            ))),
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("secret", &self.secret)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

struct SurfaceInner {
    name: String,
    shape: Shape,
    type_args: Vec<Surface>,
    params: Vec<Param>,
    variants: Vec<Variant>,
    factory: Option<Factory>,
    deconstructor: Option<Deconstructor>,
}

/// An immutable type descriptor. Identity is the full name.
#[derive(Clone)]
pub struct Surface(Arc<SurfaceInner>);

static SURFACES: OnceLock<RwLock<HashMap<TypeId, Surface>>> = OnceLock::new();

impl Surface {
    /// The process-wide surface of `T`, built on first request.
    pub fn of<T: HasSurface>() -> Surface {
        let cache = SURFACES.get_or_init(Default::default);
        let id = TypeId::of::<T>();
        if let Some(surface) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return surface.clone();
        }
        let built = T::surface();
        cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert(built)
            .clone()
    }

    pub fn builder(name: impl Into<String>, shape: Shape) -> SurfaceBuilder {
        SurfaceBuilder {
            inner: SurfaceInner {
                name: name.into(),
                shape,
                type_args: Vec::new(),
                params: Vec::new(),
                variants: Vec::new(),
                factory: None,
                deconstructor: None,
            },
        }
    }

    /// Starts a record surface named after `T`.
    pub fn record<T: Any>() -> SurfaceBuilder {
        Self::builder(any::type_name::<T>(), Shape::Record)
    }

    /// Starts an enum surface named after `T`.
    pub fn enumeration<T: Any>() -> SurfaceBuilder {
        Self::builder(any::type_name::<T>(), Shape::Enum)
    }

    pub fn alias(name: impl Into<String>, target: Surface) -> Surface {
        Self::builder(name, Shape::Alias(target)).build()
    }

    pub(crate) fn primitive<T: Any>(primitive: Primitive) -> Surface {
        Self::builder(any::type_name::<T>(), Shape::Primitive(primitive)).build()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    pub fn type_args(&self) -> &[Surface] {
        &self.0.type_args
    }

    pub fn params(&self) -> &[Param] {
        &self.0.params
    }

    pub fn variants(&self) -> &[Variant] {
        &self.0.variants
    }

    pub fn has_factory(&self) -> bool {
        self.0.factory.is_some()
    }

    pub fn primitive_kind(&self) -> Option<Primitive> {
        match self.0.shape {
            Shape::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self.0.shape, Shape::Option)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.0.shape, Shape::Primitive(_))
    }

    /// Sequences and sets.
    pub fn is_seq(&self) -> bool {
        matches!(self.0.shape, Shape::Seq | Shape::Set)
    }

    pub fn is_map(&self) -> bool {
        matches!(self.0.shape, Shape::Map)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.shape, Shape::Array)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.0.shape, Shape::Tuple)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.0.shape, Shape::Enum)
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.0.shape, Shape::Alias(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.0.shape, Shape::Record)
    }

    /// `Any` or `Nothing`.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.0.shape, Shape::Any | Shape::Nothing)
    }

    /// Follows alias chains down to the underlying surface.
    pub fn dealias(&self) -> Surface {
        let mut current = self.clone();
        while let Shape::Alias(target) = &current.0.shape {
            let next = target.clone();
            current = next;
        }
        current
    }

    /// Builds an instance through the factory.
    pub fn construct(&self, args: Args) -> Result<Dyn> {
        match &self.0.factory {
            Some(factory) => factory(args),
            None => Err(WeaverError::UnsupportedType(format!(
                "{} has no factory",
                self.name()
            ))),
        }
    }

    /// Splits a container instance into its parts.
    pub fn deconstruct(&self, instance: &Dyn) -> Result<Vec<Dyn>> {
        match &self.0.deconstructor {
            Some(split) => split(instance),
            None => Err(WeaverError::UnsupportedType(format!(
                "{} has no deconstructor",
                self.name()
            ))),
        }
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for Surface {}

impl Hash for Surface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Surface({})", self.0.name)
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder returned by [`Surface::builder`], [`Surface::record`] and
/// [`Surface::enumeration`].
pub struct SurfaceBuilder {
    inner: SurfaceInner,
}

impl SurfaceBuilder {
    pub fn type_arg(mut self, surface: Surface) -> Self {
        self.inner.type_args.push(surface);
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.inner.params.push(param);
        self
    }

    /// Adds a required field typed by what `read` returns.
    pub fn field<R, V, F>(self, name: &str, read: F) -> Self
    where
        R: Any,
        V: HasSurface,
        F: Fn(&R) -> V + Send + Sync + 'static,
    {
        self.param(Param::of::<V>(name).accessor(read))
    }

    pub fn variant<V: Data>(mut self, name: impl Into<String>, value: V) -> Self {
        self.inner.variants.push(Variant {
            name: name.into(),
            value: Dyn::new(value),
        });
        self
    }

    /// Sets the factory from a typed constructor.
    pub fn factory<T, F>(mut self, build: F) -> Self
    where
        T: Data,
        F: Fn(Args) -> Result<T> + Send + Sync + 'static,
    {
        self.inner.factory = Some(Arc::new(move |args| build(args).map(Dyn::new)));
        self
    }

    pub fn raw_factory(mut self, factory: Factory) -> Self {
        self.inner.factory = Some(factory);
        self
    }

    /// Sets the deconstructor from a typed splitter.
    pub fn deconstructor<T, F>(mut self, split: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Vec<Dyn> + Send + Sync + 'static,
    {
        self.inner.deconstructor = Some(Arc::new(move |instance: &Dyn| {
            instance
                .downcast_ref::<T>()
                .map(&split)
                .ok_or_else(|| WeaverError::Downcast {
                    expected: any::type_name::<T>(),
                    actual: instance.type_name(),
                })
        }));
        self
    }

    pub fn build(self) -> Surface {
        Surface(Arc::new(self.inner))
    }
}
