// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dynamically typed cell, key and metadata values.

use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ElementKind;

/// Metadata attached to an array, an index or a container group.
///
/// Key order carries no meaning.
pub type Metadata = BTreeMap<String, Value>;

/// A self-describing value.
///
/// `Value` is the element type of reference-kind arrays, the type of id keys
/// and of metadata values. Every variant except [`Opaque`](Value::Opaque)
/// has a portable binary encoding in the zip tensor container.
///
/// Floats compare and hash by bit pattern so that they can serve as keys.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// An arbitrary host object. Usable in memory, never serializable.
    Opaque(Opaque),
}

impl Value {
    /// The primitive element kind of this value, if it has one.
    pub fn kind(&self) -> Option<ElementKind> {
        Some(match self {
            Value::Bool(_) => ElementKind::Bool,
            Value::Char(_) => ElementKind::Char,
            Value::I8(_) => ElementKind::I8,
            Value::I16(_) => ElementKind::I16,
            Value::I32(_) => ElementKind::I32,
            Value::I64(_) => ElementKind::I64,
            Value::F32(_) => ElementKind::F32,
            Value::F64(_) => ElementKind::F64,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a float, for any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match *self {
            Value::Bool(b) => b as u8 as f64,
            Value::Char(c) => c as u32 as f64,
            Value::I8(v) => v as f64,
            Value::I16(v) => v as f64,
            Value::I32(v) => v as f64,
            Value::I64(v) => v as f64,
            Value::F32(v) => v as f64,
            Value::F64(v) => v,
            _ => return None,
        })
    }

    /// The value as an integer, for any numeric variant (floats truncate).
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Value::Bool(b) => b as i64,
            Value::Char(c) => c as u32 as i64,
            Value::I8(v) => v as i64,
            Value::I16(v) => v as i64,
            Value::I32(v) => v as i64,
            Value::I64(v) => v,
            Value::F32(v) => v as i64,
            Value::F64(v) => v as i64,
            _ => return None,
        })
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Opaque(o) => o.type_name(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Opaque(a), Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Char(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            Value::Map(v) => v.hash(state),
            Value::Opaque(o) => (Arc::as_ptr(&o.value) as *const u8 as usize).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => fmt::Display::fmt(v, f),
            Value::Char(v) => fmt::Display::fmt(v, f),
            Value::I8(v) => fmt::Display::fmt(v, f),
            Value::I16(v) => fmt::Display::fmt(v, f),
            Value::I32(v) => fmt::Display::fmt(v, f),
            Value::I64(v) => fmt::Display::fmt(v, f),
            Value::F32(v) => fmt::Display::fmt(v, f),
            Value::F64(v) => fmt::Display::fmt(v, f),
            Value::Str(v) => fmt::Display::fmt(v, f),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Opaque(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(v: $t) -> Value {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(bool => Bool, char => Char, i8 => I8, i16 => I16, i32 => I32, i64 => I64,
            f32 => F32, f64 => F64, String => Str, Vec<Value> => List,
            BTreeMap<String, Value> => Map, Opaque => Opaque);

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Value {
        Value::Str(v.to_owned())
    }
}

/// A shared host object stored inside a [`Value`].
///
/// Opaque values compare equal only to clones of themselves.
#[derive(Clone)]
pub struct Opaque {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Opaque {
            value: Arc::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn floats_are_keys() {
        let mut set = HashSet::new();
        assert!(set.insert(Value::F64(0.5)));
        assert!(!set.insert(Value::F64(0.5)));
        assert!(set.insert(Value::F64(f64::NAN)));
        assert!(set.contains(&Value::F64(f64::NAN)));
        assert_ne!(Value::I32(1), Value::I64(1));
    }

    #[test]
    fn opaque_identity() {
        let a = Value::from(Opaque::new(vec![1u8, 2, 3]));
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Value::from(Opaque::new(vec![1u8, 2, 3])));
        match &a {
            Value::Opaque(o) => assert_eq!(o.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2, 3])),
            _ => unreachable!(),
        }
    }

    #[test]
    fn display_nested() {
        let mut map = BTreeMap::new();
        map.insert("k".to_owned(), Value::List(vec![Value::I32(1), "x".into()]));
        assert_eq!(Value::Map(map).to_string(), "{k: [1, x]}");
    }
}
