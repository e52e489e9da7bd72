// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Element types of arrays.
//!
//! [`Element`] is implemented for exactly one Rust type per
//! [`ElementKind`]; [`Numeric`] for every kind except `Ref`.

use std::fmt;

use num_traits::{AsPrimitive, Float, WrappingAdd, WrappingMul, WrappingSub};

use crate::error::{Result, TensorError};
use crate::{AnyArray, Array, ElementKind, Value};

mod private {
    pub trait Sealed {}
}

/// A type that can be stored in an [`Array`].
///
/// This trait is sealed: the set of element kinds is fixed.
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static + private::Sealed {
    /// The kind tag of this element type.
    const KIND: ElementKind;

    /// The fill value of freshly allocated arrays.
    fn zero() -> Self;

    fn to_value(&self) -> Value;

    /// Convert a value to this element type.
    ///
    /// Numeric values convert between numeric kinds with `as` semantics;
    /// this may lose precision.
    ///
    /// ***Errors*** with `UnsupportedValueType` if the value is not
    /// representable.
    fn from_value(value: &Value) -> Result<Self>;

    #[doc(hidden)]
    fn into_any(array: Array<Self>) -> AnyArray;
    #[doc(hidden)]
    fn from_any(array: AnyArray) -> Result<Array<Self>, AnyArray>;
    #[doc(hidden)]
    fn any_ref(array: &AnyArray) -> Option<&Array<Self>>;
    #[doc(hidden)]
    fn any_mut(array: &mut AnyArray) -> Option<&mut Array<Self>>;
}

/// An element type that cell-wise functions can compute with.
///
/// Integer arithmetic wraps on overflow; integer division and remainder
/// report a zero divisor as `None`. `Bool` and `Char` compute through their
/// integer values (`false`/`true` as 0/1, characters as code points).
pub trait Numeric: Element + Copy + PartialOrd {
    fn from_i64(v: i64) -> Self;
    fn from_f64(v: f64) -> Self;
    fn to_i64(self) -> i64;
    fn to_f64(self) -> f64;

    fn plus(self, rhs: Self) -> Self;
    fn minus(self, rhs: Self) -> Self;
    fn times(self, rhs: Self) -> Self;
    fn divide(self, rhs: Self) -> Option<Self>;
    fn remainder(self, rhs: Self) -> Option<Self>;
    fn negate(self) -> Self;
    fn magnitude(self) -> Self;

    /// Apply a real-valued function through `f64`.
    #[inline]
    fn map_real<F: Fn(f64) -> f64>(self, f: F) -> Self {
        Self::from_f64(f(self.to_f64()))
    }

    /// Convert a numeric value of any kind into this kind.
    #[inline]
    fn cast_from<B: Numeric>(v: B) -> Self {
        if B::KIND.is_float() {
            Self::from_f64(v.to_f64())
        } else {
            Self::from_i64(v.to_i64())
        }
    }
}

fn unsupported(value: &Value, kind: ElementKind) -> TensorError {
    TensorError::UnsupportedValueType(format!("{} value cannot be stored as {}", value.type_name(), kind))
}

fn numeric_from_value<A: Numeric>(value: &Value) -> Result<A> {
    match value {
        Value::F32(_) | Value::F64(_) => value.as_f64().map(A::from_f64),
        _ => value.as_i64().map(A::from_i64),
    }
    .ok_or_else(|| unsupported(value, A::KIND))
}

macro_rules! impl_element {
    ($t:ty, $kind:ident, $zero:expr) => {
        impl private::Sealed for $t {}

        impl Element for $t {
            const KIND: ElementKind = ElementKind::$kind;

            #[inline]
            fn zero() -> Self {
                $zero
            }

            fn to_value(&self) -> Value {
                Value::from(self.clone())
            }

            fn from_value(value: &Value) -> Result<Self> {
                element_from_value::<$t>(value)
            }

            fn into_any(array: Array<Self>) -> AnyArray {
                AnyArray::$kind(array)
            }

            fn from_any(array: AnyArray) -> Result<Array<Self>, AnyArray> {
                match array {
                    AnyArray::$kind(a) => Ok(a),
                    other => Err(other),
                }
            }

            fn any_ref(array: &AnyArray) -> Option<&Array<Self>> {
                match array {
                    AnyArray::$kind(a) => Some(a),
                    _ => None,
                }
            }

            fn any_mut(array: &mut AnyArray) -> Option<&mut Array<Self>> {
                match array {
                    AnyArray::$kind(a) => Some(a),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(bool, Bool, false);
impl_element!(char, Char, '\0');
impl_element!(i8, I8, 0);
impl_element!(i16, I16, 0);
impl_element!(i32, I32, 0);
impl_element!(i64, I64, 0);
impl_element!(f32, F32, 0.);
impl_element!(f64, F64, 0.);
impl_element!(Value, Ref, Value::Null);

// Dispatch for `from_value`: numeric kinds convert, `Value` clones.
trait FromValue: Sized {
    fn from_value_impl(value: &Value) -> Result<Self>;
}

fn element_from_value<A: FromValue>(value: &Value) -> Result<A> {
    A::from_value_impl(value)
}

impl FromValue for Value {
    fn from_value_impl(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

macro_rules! from_value_numeric {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value_impl(value: &Value) -> Result<Self> {
                    numeric_from_value::<$t>(value)
                }
            }
        )*
    };
}

from_value_numeric!(bool, i8, i16, i32, i64, f32, f64);

impl FromValue for char {
    fn from_value_impl(value: &Value) -> Result<Self> {
        match *value {
            Value::Char(c) => Ok(c),
            _ => value
                .as_i64()
                .and_then(|v| u32::try_from(v).ok())
                .and_then(char::from_u32)
                .ok_or_else(|| unsupported(value, ElementKind::Char)),
        }
    }
}

macro_rules! impl_numeric_int {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn from_i64(v: i64) -> Self { v.as_() }
                #[inline]
                fn from_f64(v: f64) -> Self { v.as_() }
                #[inline]
                fn to_i64(self) -> i64 { self.as_() }
                #[inline]
                fn to_f64(self) -> f64 { self.as_() }
                #[inline]
                fn plus(self, rhs: Self) -> Self { WrappingAdd::wrapping_add(&self, &rhs) }
                #[inline]
                fn minus(self, rhs: Self) -> Self { WrappingSub::wrapping_sub(&self, &rhs) }
                #[inline]
                fn times(self, rhs: Self) -> Self { WrappingMul::wrapping_mul(&self, &rhs) }
                #[inline]
                fn divide(self, rhs: Self) -> Option<Self> {
                    if rhs == 0 { None } else { Some(self.wrapping_div(rhs)) }
                }
                #[inline]
                fn remainder(self, rhs: Self) -> Option<Self> {
                    if rhs == 0 { None } else { Some(self.wrapping_rem(rhs)) }
                }
                #[inline]
                fn negate(self) -> Self { self.wrapping_neg() }
                #[inline]
                fn magnitude(self) -> Self { self.wrapping_abs() }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64);

macro_rules! impl_numeric_float {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn from_i64(v: i64) -> Self { v.as_() }
                #[inline]
                fn from_f64(v: f64) -> Self { v.as_() }
                #[inline]
                fn to_i64(self) -> i64 { self.as_() }
                #[inline]
                fn to_f64(self) -> f64 { self.as_() }
                #[inline]
                fn plus(self, rhs: Self) -> Self { self + rhs }
                #[inline]
                fn minus(self, rhs: Self) -> Self { self - rhs }
                #[inline]
                fn times(self, rhs: Self) -> Self { self * rhs }
                #[inline]
                fn divide(self, rhs: Self) -> Option<Self> { Some(self / rhs) }
                #[inline]
                fn remainder(self, rhs: Self) -> Option<Self> { Some(self % rhs) }
                #[inline]
                fn negate(self) -> Self { -self }
                #[inline]
                fn magnitude(self) -> Self { Float::abs(self) }
            }
        )*
    };
}

impl_numeric_float!(f32, f64);

// Bool and char compute through their integer values.
macro_rules! impl_numeric_via_i64 {
    ($t:ty, $from:expr, $to:expr) => {
        impl Numeric for $t {
            #[inline]
            fn from_i64(v: i64) -> Self {
                $from(v)
            }
            #[inline]
            fn from_f64(v: f64) -> Self {
                $from(v as i64)
            }
            #[inline]
            fn to_i64(self) -> i64 {
                $to(self)
            }
            #[inline]
            fn to_f64(self) -> f64 {
                $to(self) as f64
            }
            fn plus(self, rhs: Self) -> Self {
                Self::from_i64(self.to_i64().wrapping_add(rhs.to_i64()))
            }
            fn minus(self, rhs: Self) -> Self {
                Self::from_i64(self.to_i64().wrapping_sub(rhs.to_i64()))
            }
            fn times(self, rhs: Self) -> Self {
                Self::from_i64(self.to_i64().wrapping_mul(rhs.to_i64()))
            }
            fn divide(self, rhs: Self) -> Option<Self> {
                self.to_i64().checked_div(rhs.to_i64()).map(Self::from_i64)
            }
            fn remainder(self, rhs: Self) -> Option<Self> {
                self.to_i64().checked_rem(rhs.to_i64()).map(Self::from_i64)
            }
            fn negate(self) -> Self {
                Self::from_i64(self.to_i64().wrapping_neg())
            }
            fn magnitude(self) -> Self {
                self
            }
        }
    };
}

impl_numeric_via_i64!(bool, |v: i64| v != 0, |b: bool| b as i64);
impl_numeric_via_i64!(
    char,
    |v: i64| u32::try_from(v).ok().and_then(char::from_u32).unwrap_or('\0'),
    |c: char| c as u32 as i64
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_wraps() {
        assert_eq!(i8::MAX.plus(1), i8::MIN);
        assert_eq!(i8::MIN.divide(-1), Some(i8::MIN));
        assert_eq!(7i32.divide(0), None);
        assert_eq!(7i32.remainder(0), None);
        assert_eq!(i16::MIN.magnitude(), i16::MIN);
    }

    #[test]
    fn float_division_by_zero_is_infinite() {
        assert_eq!(1.0f64.divide(0.), Some(f64::INFINITY));
    }

    #[test]
    fn casts_are_lossy() {
        assert_eq!(i8::cast_from(300i32), 44);
        assert_eq!(i32::cast_from(2.9f64), 2);
        assert_eq!(f32::cast_from(16_777_217i64), 16_777_216.);
        assert!(!bool::cast_from(0.5f64));
        assert!(bool::cast_from(-3i16));
        assert_eq!(char::cast_from(65i32), 'A');
    }

    #[test]
    fn from_value() {
        assert_eq!(i32::from_value(&Value::I64(5)).unwrap(), 5);
        assert_eq!(f64::from_value(&Value::Bool(true)).unwrap(), 1.);
        assert_eq!(char::from_value(&Value::I32(97)).unwrap(), 'a');
        assert_eq!(
            i32::from_value(&Value::from("x")).unwrap_err().kind(),
            crate::ErrorKind::UnsupportedValueType
        );
        assert_eq!(Value::from_value(&Value::from("x")).unwrap(), Value::from("x"));
    }
}
