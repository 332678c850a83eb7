//! Type-erased instances.
//!
//! Codecs, factories and the zero synthesizer operate on descriptors rather
//! than static types, so the values they move around are boxed behind
//! [`Dyn`]. Any `Clone + PartialEq + Debug` type that is `Send + Sync` can be
//! wrapped.

use std::any::{self, Any};
use std::fmt;

use crate::error::{Result, WeaverError};

/// Object-safe view of a concrete value.
pub trait Instance: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_instance(&self) -> Box<dyn Instance>;
    fn eq_instance(&self, other: &dyn Instance) -> bool;
    fn debug_instance(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn type_name(&self) -> &'static str;
}

impl<T> Instance for T
where
    T: Any + Send + Sync + Clone + PartialEq + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_instance(&self) -> Box<dyn Instance> {
        Box::new(self.clone())
    }

    fn eq_instance(&self, other: &dyn Instance) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn debug_instance(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// A boxed, cloneable, comparable instance of some concrete type.
pub struct Dyn(Box<dyn Instance>);

impl Dyn {
    /// Wraps `value`. Wrapping a `Dyn` does not nest.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + Clone + PartialEq + fmt::Debug,
    {
        let boxed: Box<dyn Any> = Box::new(value);
        match boxed.downcast::<Dyn>() {
            Ok(inner) => *inner,
            Err(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Dyn(value),
                Err(_) => unreachable!("box was created from T"),
            },
        }
    }

    /// The null marker, which is the unit value `()`.
    pub fn null() -> Self {
        Dyn(Box::new(()))
    }

    pub fn is_null(&self) -> bool {
        self.is::<()>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Unwraps into `T`, handing the instance back when it is something else.
    pub fn downcast<T: Any>(self) -> Result<T, Dyn> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.0.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("type checked above"),
        }
    }

    /// Unwraps into `T`, or a [`WeaverError::Downcast`] naming both types.
    /// Asking for `Dyn` itself returns the instance unchanged.
    pub fn take<T: Any>(self) -> Result<T> {
        let boxed: Box<dyn Any> = Box::new(self);
        let this = match boxed.downcast::<T>() {
            Ok(this) => return Ok(*this),
            Err(boxed) => match boxed.downcast::<Dyn>() {
                Ok(this) => *this,
                Err(_) => unreachable!("box was created from Dyn"),
            },
        };
        let actual = this.type_name();
        this.downcast::<T>().map_err(|_| WeaverError::Downcast {
            expected: any::type_name::<T>(),
            actual,
        })
    }

    /// Borrowing variant of [`Dyn::take`].
    pub fn to<T: Any + Clone>(&self) -> Result<T> {
        if let Some(this) = (self as &dyn Any).downcast_ref::<T>() {
            return Ok(this.clone());
        }
        self.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| WeaverError::Downcast {
                expected: any::type_name::<T>(),
                actual: self.type_name(),
            })
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl Default for Dyn {
    fn default() -> Self {
        Dyn::null()
    }
}

impl Clone for Dyn {
    fn clone(&self) -> Self {
        Dyn(self.0.clone_instance())
    }
}

impl PartialEq for Dyn {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_instance(other.0.as_ref())
    }
}

impl fmt::Debug for Dyn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.debug_instance(f)
    }
}

/// Ordered constructor arguments handed to a factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(pub Vec<Dyn>);

impl Args {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clones argument `index` out as a `T`.
    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T> {
        self.0
            .get(index)
            .ok_or_else(|| {
                WeaverError::IllegalArgument(format!(
                    "missing constructor argument {index} of {}",
                    self.0.len()
                ))
            })?
            .to::<T>()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dyn> {
        self.0.iter()
    }
}

impl From<Vec<Dyn>> for Args {
    fn from(args: Vec<Dyn>) -> Self {
        Args(args)
    }
}
