use std::any::{self, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use weaver_msgpack::{RawMsgPack, Value};

use super::{HasSurface, Primitive, Shape, Surface};
use crate::dynamic::{Args, Dyn};
use crate::error::{Result, WeaverError};

macro_rules! primitive_surface {
    ($($t:ty => $p:ident),+ $(,)?) => {
        $(
            impl HasSurface for $t {
                fn surface() -> Surface {
                    Surface::primitive::<$t>(Primitive::$p)
                }
            }
        )+
    };
}

primitive_surface! {
    () => Unit,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

fn take_all<T: HasSurface>(args: Args) -> Result<Vec<T>> {
    args.0.into_iter().map(Dyn::take::<T>).collect()
}

fn take_pairs<K: HasSurface, V: HasSurface>(args: Args) -> Result<Vec<(K, V)>> {
    let mut parts = args.0.into_iter();
    let mut pairs = Vec::with_capacity(parts.len() / 2);
    while let (Some(k), Some(v)) = (parts.next(), parts.next()) {
        pairs.push((k.take::<K>()?, v.take::<V>()?));
    }
    Ok(pairs)
}

fn parts<'a, T: HasSurface>(items: impl IntoIterator<Item = &'a T>) -> Vec<Dyn> {
    items.into_iter().map(|item| Dyn::new(item.clone())).collect()
}

fn pair_parts<'a, K: HasSurface, V: HasSurface>(
    entries: impl IntoIterator<Item = (&'a K, &'a V)>,
) -> Vec<Dyn> {
    entries
        .into_iter()
        .flat_map(|(k, v)| [Dyn::new(k.clone()), Dyn::new(v.clone())])
        .collect()
}

/// `Vec<u8>` is binary; every other `Vec<T>` is a sequence.
impl<T: HasSurface> HasSurface for Vec<T> {
    fn surface() -> Surface {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            return Surface::primitive::<Vec<u8>>(Primitive::Binary);
        }
        Surface::builder(any::type_name::<Self>(), Shape::Seq)
            .type_arg(Surface::of::<T>())
            .factory(take_all::<T>)
            .deconstructor(|v: &Vec<T>| parts(v))
            .build()
    }
}

impl<T: HasSurface> HasSurface for VecDeque<T> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Seq)
            .type_arg(Surface::of::<T>())
            .factory(|args: Args| take_all::<T>(args).map(VecDeque::from))
            .deconstructor(|v: &VecDeque<T>| parts(v))
            .build()
    }
}

impl<T: HasSurface> HasSurface for Box<[T]> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Array)
            .type_arg(Surface::of::<T>())
            .factory(|args: Args| take_all::<T>(args).map(Vec::into_boxed_slice))
            .deconstructor(|v: &Box<[T]>| parts(v.iter()))
            .build()
    }
}

impl<T: HasSurface + Eq + Hash> HasSurface for HashSet<T> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Set)
            .type_arg(Surface::of::<T>())
            .factory(|args: Args| Ok(take_all::<T>(args)?.into_iter().collect::<HashSet<T>>()))
            .deconstructor(|v: &HashSet<T>| parts(v))
            .build()
    }
}

impl<T: HasSurface + Ord> HasSurface for BTreeSet<T> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Set)
            .type_arg(Surface::of::<T>())
            .factory(|args: Args| Ok(take_all::<T>(args)?.into_iter().collect::<BTreeSet<T>>()))
            .deconstructor(|v: &BTreeSet<T>| parts(v))
            .build()
    }
}

impl<K: HasSurface + Eq + Hash, V: HasSurface> HasSurface for HashMap<K, V> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Map)
            .type_arg(Surface::of::<K>())
            .type_arg(Surface::of::<V>())
            .factory(|args: Args| {
                Ok(take_pairs::<K, V>(args)?.into_iter().collect::<HashMap<K, V>>())
            })
            .deconstructor(|m: &HashMap<K, V>| pair_parts(m))
            .build()
    }
}

impl<K: HasSurface + Ord, V: HasSurface> HasSurface for BTreeMap<K, V> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Map)
            .type_arg(Surface::of::<K>())
            .type_arg(Surface::of::<V>())
            .factory(|args: Args| {
                Ok(take_pairs::<K, V>(args)?.into_iter().collect::<BTreeMap<K, V>>())
            })
            .deconstructor(|m: &BTreeMap<K, V>| pair_parts(m))
            .build()
    }
}

impl<T: HasSurface> HasSurface for Option<T> {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Option)
            .type_arg(Surface::of::<T>())
            .factory(|args: Args| match args.0.into_iter().next() {
                Some(inner) => inner.take::<T>().map(Some),
                None => Ok(None),
            })
            .deconstructor(|v: &Option<T>| parts(v))
            .build()
    }
}

macro_rules! tuple_surface {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: HasSurface),+> HasSurface for ($($name,)+) {
            fn surface() -> Surface {
                Surface::builder(any::type_name::<Self>(), Shape::Tuple)
                    $(.type_arg(Surface::of::<$name>()))+
                    .factory(|args: Args| {
                        let mut parts = args.0.into_iter();
                        Ok(($(next_part::<$name>(&mut parts)?,)+))
                    })
                    .deconstructor(|t: &Self| vec![$(Dyn::new(t.$idx.clone())),+])
                    .build()
            }
        }
    };
}

fn next_part<T: HasSurface>(parts: &mut impl Iterator<Item = Dyn>) -> Result<T> {
    parts
        .next()
        .ok_or_else(|| {
            WeaverError::IllegalArgument(format!(
                "missing tuple component {}",
                any::type_name::<T>()
            ))
        })?
        .take::<T>()
}

tuple_surface!(A.0);
tuple_surface!(A.0, B.1);
tuple_surface!(A.0, B.1, C.2);
tuple_surface!(A.0, B.1, C.2, D.3);
tuple_surface!(A.0, B.1, C.2, D.3, E.4);
tuple_surface!(A.0, B.1, C.2, D.3, E.4, F.5);
tuple_surface!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);

impl HasSurface for Value {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Any).build()
    }
}

impl HasSurface for Dyn {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Any).build()
    }
}

/// The bottom type.
impl HasSurface for Infallible {
    fn surface() -> Surface {
        Surface::builder(any::type_name::<Self>(), Shape::Nothing).build()
    }
}

macro_rules! opaque_surface {
    ($($t:ty),+) => {
        $(
            impl HasSurface for $t {
                fn surface() -> Surface {
                    Surface::builder(any::type_name::<$t>(), Shape::Opaque).build()
                }
            }
        )+
    };
}

opaque_surface!(RawMsgPack, Duration, DateTime<Utc>, NaiveDate);
