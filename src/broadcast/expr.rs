// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::sync::Arc;

use crate::error::{Result, TensorError};
use crate::{ElementKind, Numeric};

/// A built-in function of one argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Sqrt,
    Exp,
    Ln,
}

/// A built-in function of two arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Min,
    Max,
    Pow,
}

/// A user function of any number of arguments, evaluated through `f64`.
#[derive(Clone)]
pub struct NaryFn(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>);

impl fmt::Debug for NaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NaryFn")
    }
}

/// A cell-wise function, as a tree of function descriptors.
///
/// Leaves are operands ([`Expr::arg`]) and constants; inner nodes are
/// built-in or user functions. The whole tree is evaluated once per output
/// cell, so compound expressions never allocate intermediate arrays.
///
/// Arithmetic operators build trees:
///
/// ```
/// use ndtensor::Expr;
///
/// // (a + b) * 0.5, then the square root
/// let mean = ((Expr::arg(0) + Expr::arg(1)) * 0.5).sqrt();
/// assert_eq!(mean.arity(), 2);
/// assert_eq!(mean.eval::<f64>(&[3., 5.]).unwrap(), 2.);
/// ```
#[derive(Clone, Debug)]
pub enum Expr {
    /// The cell of operand `n`.
    Arg(usize),
    Const(f64),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Nary(NaryFn, Vec<Expr>),
}

impl Expr {
    pub fn arg(n: usize) -> Expr {
        Expr::Arg(n)
    }

    pub fn constant(value: f64) -> Expr {
        Expr::Const(value)
    }

    pub fn unary(op: UnaryOp, e: Expr) -> Expr {
        Expr::Unary(op, Box::new(e))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Apply `f` to the values of `args`.
    ///
    /// In an integer evaluation kind, the arguments are widened to `f64`
    /// and the result truncated back.
    pub fn nary<F>(f: F, args: Vec<Expr>) -> Expr
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Expr::Nary(NaryFn(Arc::new(f)), args)
    }

    pub fn abs(self) -> Expr {
        Expr::unary(UnaryOp::Abs, self)
    }

    pub fn sqrt(self) -> Expr {
        Expr::unary(UnaryOp::Sqrt, self)
    }

    pub fn exp(self) -> Expr {
        Expr::unary(UnaryOp::Exp, self)
    }

    pub fn ln(self) -> Expr {
        Expr::unary(UnaryOp::Ln, self)
    }

    pub fn min(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Min, self, rhs.into())
    }

    pub fn max(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Max, self, rhs.into())
    }

    pub fn pow(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Pow, self, rhs.into())
    }

    /// Number of operands the expression reads: one more than the highest
    /// argument number, or 0.
    pub fn arity(&self) -> usize {
        match self {
            Expr::Arg(n) => n + 1,
            Expr::Const(_) => 0,
            Expr::Unary(_, e) => e.arity(),
            Expr::Binary(_, a, b) => a.arity().max(b.arity()),
            Expr::Nary(_, args) => args.iter().map(Expr::arity).max().unwrap_or(0),
        }
    }

    /// The kinds of the constants in the expression, each the narrowest
    /// integer kind holding it exactly, or `F64`.
    pub fn constant_kinds(&self) -> Vec<ElementKind> {
        let mut kinds = Vec::new();
        self.visit_constants(&mut |c| kinds.push(constant_kind(c)));
        kinds
    }

    fn visit_constants(&self, f: &mut impl FnMut(f64)) {
        match self {
            Expr::Arg(_) => {}
            Expr::Const(c) => f(*c),
            Expr::Unary(_, e) => e.visit_constants(f),
            Expr::Binary(_, a, b) => {
                a.visit_constants(f);
                b.visit_constants(f);
            }
            Expr::Nary(_, args) => args.iter().for_each(|e| e.visit_constants(f)),
        }
    }

    /// Evaluate in the numeric kind `T` with one value per operand.
    ///
    /// Constants are converted to `T` first. Integer arithmetic wraps.
    ///
    /// ***Errors*** with `DivisionByZero` if an integer division or
    /// remainder has a zero divisor, and `InvalidMatchingSpec` if an
    /// argument number has no value.
    pub fn eval<T: Numeric>(&self, args: &[T]) -> Result<T> {
        Ok(match self {
            Expr::Arg(n) => *args.get(*n).ok_or_else(|| {
                TensorError::InvalidMatchingSpec(format!(
                    "expression reads operand {} of {}",
                    n,
                    args.len()
                ))
            })?,
            Expr::Const(c) => T::from_f64(*c),
            Expr::Unary(op, e) => {
                let x = e.eval(args)?;
                match op {
                    UnaryOp::Neg => x.negate(),
                    UnaryOp::Abs => x.magnitude(),
                    UnaryOp::Sqrt => x.map_real(f64::sqrt),
                    UnaryOp::Exp => x.map_real(f64::exp),
                    UnaryOp::Ln => x.map_real(f64::ln),
                }
            }
            Expr::Binary(op, a, b) => {
                let (x, y) = (a.eval(args)?, b.eval(args)?);
                match op {
                    BinaryOp::Add => x.plus(y),
                    BinaryOp::Sub => x.minus(y),
                    BinaryOp::Mul => x.times(y),
                    BinaryOp::Div => x.divide(y).ok_or(TensorError::DivisionByZero)?,
                    BinaryOp::Rem => x.remainder(y).ok_or(TensorError::DivisionByZero)?,
                    BinaryOp::Min => {
                        if y < x {
                            y
                        } else {
                            x
                        }
                    }
                    BinaryOp::Max => {
                        if y > x {
                            y
                        } else {
                            x
                        }
                    }
                    BinaryOp::Pow => T::from_f64(x.to_f64().powf(y.to_f64())),
                }
            }
            Expr::Nary(NaryFn(f), es) => {
                let values = es
                    .iter()
                    .map(|e| e.eval(args).map(Numeric::to_f64))
                    .collect::<Result<Vec<f64>>>()?;
                T::from_f64(f(&values))
            }
        })
    }
}

fn constant_kind(c: f64) -> ElementKind {
    // 2^63 is the first whole float beyond i64
    if c.fract() != 0. || !(-9_223_372_036_854_775_808. ..9_223_372_036_854_775_808.).contains(&c) {
        ElementKind::F64
    } else if (i8::MIN as f64..=i8::MAX as f64).contains(&c) {
        ElementKind::I8
    } else if (i16::MIN as f64..=i16::MAX as f64).contains(&c) {
        ElementKind::I16
    } else if (i32::MIN as f64..=i32::MAX as f64).contains(&c) {
        ElementKind::I32
    } else {
        ElementKind::I64
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Expr {
        Expr::Const(value)
    }
}

macro_rules! impl_binary_op {
    ($trt:ident, $mth:ident, $op:ident) => {
        impl<E: Into<Expr>> $trt<E> for Expr {
            type Output = Expr;

            fn $mth(self, rhs: E) -> Expr {
                Expr::binary(BinaryOp::$op, self, rhs.into())
            }
        }

        impl $trt<Expr> for f64 {
            type Output = Expr;

            fn $mth(self, rhs: Expr) -> Expr {
                Expr::binary(BinaryOp::$op, Expr::Const(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, Add);
impl_binary_op!(Sub, sub, Sub);
impl_binary_op!(Mul, mul, Mul);
impl_binary_op!(Div, div, Div);
impl_binary_op!(Rem, rem, Rem);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn integer_evaluation() {
        let e = (Expr::arg(0) - Expr::arg(1)) / 2.;
        assert_eq!(e.eval::<i32>(&[7, 2]).unwrap(), 2);
        assert_eq!(e.eval::<f64>(&[7., 2.]).unwrap(), 2.5);
        let mod0 = Expr::arg(0) % Expr::arg(1);
        assert_eq!(mod0.eval::<i64>(&[1, 0]).unwrap_err().kind(), ErrorKind::DivisionByZero);
        assert!(mod0.eval::<f32>(&[1., 0.]).unwrap().is_nan());
    }

    #[test]
    fn user_functions_of_any_arity() {
        let logsum = Expr::nary(|xs| xs.iter().map(|x| x.exp()).sum::<f64>().ln(), vec![
            Expr::arg(0),
            Expr::arg(1),
            Expr::arg(2) * 2.,
        ]);
        assert_eq!(logsum.arity(), 3);
        let v = logsum.eval::<f64>(&[0., 0., 0.]).unwrap();
        assert!((v - 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn min_max_pow_neg() {
        let e = -Expr::arg(0).max(1.).min(Expr::arg(1)).pow(2.);
        assert_eq!(e.eval::<i16>(&[-5, 3]).unwrap(), -1);
        assert_eq!(e.eval::<i16>(&[9, 3]).unwrap(), -9);
        assert_eq!((1. - Expr::arg(0)).eval::<i8>(&[3]).unwrap(), -2);
    }

    #[test]
    fn kinds_of_constants() {
        let e = (Expr::arg(0) * 0.5 + 100.).max(-1e6) - Expr::nary(|xs| xs[0], vec![Expr::constant(1e12)]);
        assert_eq!(e.constant_kinds(), vec![
            ElementKind::F64,
            ElementKind::I8,
            ElementKind::I32,
            ElementKind::I64,
        ]);
        assert!(Expr::arg(1).constant_kinds().is_empty());
        assert_eq!(Expr::constant(f64::NAN).constant_kinds(), vec![ElementKind::F64]);
        assert_eq!(Expr::constant(1e19).constant_kinds(), vec![ElementKind::F64]);
        assert_eq!(Expr::constant(-300.).constant_kinds(), vec![ElementKind::I16]);
    }

    #[test]
    fn missing_operand() {
        let err = Expr::arg(2).eval::<i32>(&[1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMatchingSpec);
    }
}
