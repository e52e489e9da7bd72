// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cell-wise evaluation of expressions over operands of different shapes.
//!
//! [`Broadcast`] collects operands lock step, matches their dimensions
//! onto the largest operand, promotes their element kinds to a common
//! numeric kind and evaluates an [`Expr`] once per result cell.
//!
//! ## Dimension matching
//!
//! The largest operand is the first one of maximal rank; the result has its
//! shape. For every other operand:
//!
//! 1. with equal rank, the shape must be identical, or the call fails with
//!    `ShapeMismatch`;
//! 2. with smaller rank and no explicit mapping, its dimension `i` follows
//!    dimension `i` of the largest operand, and any size disagreement fails
//!    with `UnmatchableShape`;
//! 3. with an explicit mapping ([`Broadcast::and_matched`]), its dimension
//!    `i` follows dimension `map[i]`; a map of the wrong length, with a
//!    repeated or out of range target, or a target of another size fails
//!    with `InvalidMatchingSpec`.
//!
//! No other alignment is ever attempted.
//!
//! ## Element kinds
//!
//! Without an output kind, every operand is read in the promotion of all
//! operand kinds (see [`ElementKind::promote`]) and the result has that
//! kind. Constants take part in the promotion: a whole number counts as
//! the narrowest integer kind holding it, any other constant as `F64`, so
//! `x * 0.5` over `i32` cells is evaluated in `f64`. With an output kind, every operand is converted to it on read.
//! Conversions follow `as` semantics and may lose precision.

mod expr;
mod matching;
#[cfg(feature = "rayon")]
mod par;

pub use self::expr::{BinaryOp, Expr, NaryFn, UnaryOp};

use std::fmt;

use tracing::debug;

use self::matching::Plan;
use crate::dimension;
use crate::error::{Result, TensorError};
use crate::index::Ids;
use crate::{AnyArray, Array, Element, ElementKind, Numeric, Tensor};

/// A numeric operand of a [`Broadcast`].
///
/// Implemented for every [`Tensor`] of numeric elements (arrays, views,
/// shells) and for [`AnyArray`].
pub trait CellSource: Sync {
    fn source_shape(&self) -> &[usize];

    fn source_kind(&self) -> ElementKind;

    /// Read one cell as an integer; float kinds truncate.
    fn cell_i64(&self, index: &[usize]) -> Result<i64>;

    /// Read one cell as a float.
    fn cell_f64(&self, index: &[usize]) -> Result<f64>;

    /// Id keys carried over to a result of this operand's shape.
    fn source_ids(&self) -> Option<&Ids> {
        None
    }
}

impl<T> CellSource for T
where
    T: Tensor + Sync,
    T::Elem: Numeric,
{
    fn source_shape(&self) -> &[usize] {
        self.shape()
    }

    fn source_kind(&self) -> ElementKind {
        <T::Elem as Element>::KIND
    }

    fn source_ids(&self) -> Option<&Ids> {
        self.ids()
    }

    fn cell_i64(&self, index: &[usize]) -> Result<i64> {
        self.get_cell(index).map(Numeric::to_i64)
    }

    fn cell_f64(&self, index: &[usize]) -> Result<f64> {
        self.get_cell(index).map(Numeric::to_f64)
    }
}

fn not_numeric() -> TensorError {
    TensorError::UnsupportedValueType("Ref arrays cannot be evaluated cell-wise".into())
}

impl CellSource for AnyArray {
    fn source_shape(&self) -> &[usize] {
        self.shape()
    }

    fn source_kind(&self) -> ElementKind {
        self.kind()
    }

    fn source_ids(&self) -> Option<&Ids> {
        self.ids()
    }

    fn cell_i64(&self, index: &[usize]) -> Result<i64> {
        match self {
            AnyArray::Ref(_) => Err(not_numeric()),
            AnyArray::Bool(a) => a.cell_i64(index),
            AnyArray::Char(a) => a.cell_i64(index),
            AnyArray::I8(a) => a.cell_i64(index),
            AnyArray::I16(a) => a.cell_i64(index),
            AnyArray::I32(a) => a.cell_i64(index),
            AnyArray::I64(a) => a.cell_i64(index),
            AnyArray::F32(a) => a.cell_i64(index),
            AnyArray::F64(a) => a.cell_i64(index),
        }
    }

    fn cell_f64(&self, index: &[usize]) -> Result<f64> {
        match self {
            AnyArray::Ref(_) => Err(not_numeric()),
            AnyArray::Bool(a) => a.cell_f64(index),
            AnyArray::Char(a) => a.cell_f64(index),
            AnyArray::I8(a) => a.cell_f64(index),
            AnyArray::I16(a) => a.cell_f64(index),
            AnyArray::I32(a) => a.cell_f64(index),
            AnyArray::I64(a) => a.cell_f64(index),
            AnyArray::F32(a) => a.cell_f64(index),
            AnyArray::F64(a) => a.cell_f64(index),
        }
    }
}

enum Operand<'a> {
    Borrowed(&'a dyn CellSource),
    // scalars, lifted to rank 0
    Owned(AnyArray),
}

impl Operand<'_> {
    fn source(&self) -> &dyn CellSource {
        match self {
            Operand::Borrowed(s) => *s,
            Operand::Owned(a) => a,
        }
    }
}

/// Read an operand cell in the evaluation kind `T`.
#[inline]
fn read<T: Numeric>(src: &dyn CellSource, index: &[usize]) -> Result<T> {
    if src.source_kind().is_float() {
        src.cell_f64(index).map(T::from_f64)
    } else {
        src.cell_i64(index).map(T::from_i64)
    }
}

/// Cell-wise evaluation builder.
///
/// ```
/// use ndtensor::{Array, Broadcast, ElementKind, Expr, Value};
///
/// let a = Array::from_shape_fn([3, 4, 6], |ix| ix[2] as i32);
/// let b = Array::from_elem([6, 3], 0.5f64);
///
/// // b's dimensions 0 and 1 follow a's dimensions 2 and 0
/// let sum = Broadcast::new(Expr::arg(0) + Expr::arg(1))
///     .and(&a)
///     .and_matched(&b, &[2, 0])
///     .apply()
///     .unwrap();
/// assert_eq!(sum.shape(), &[3, 4, 6]);
/// assert_eq!(sum.kind(), ElementKind::F64);
/// assert_eq!(sum.get_value(&[0, 0, 5]).unwrap(), Value::F64(5.5));
/// ```
pub struct Broadcast<'a> {
    expr: Expr,
    operands: Vec<(Operand<'a>, Option<Vec<usize>>)>,
    output_kind: Option<ElementKind>,
}

impl<'a> Broadcast<'a> {
    pub fn new(expr: Expr) -> Self {
        Broadcast {
            expr,
            operands: Vec::new(),
            output_kind: None,
        }
    }

    /// Add an operand matched automatically.
    pub fn and<S: CellSource>(mut self, operand: &'a S) -> Self {
        self.operands.push((Operand::Borrowed(operand), None));
        self
    }

    /// Add an operand whose dimension `i` follows dimension `map[i]` of the
    /// largest operand.
    pub fn and_matched<S: CellSource>(mut self, operand: &'a S, map: &[usize]) -> Self {
        self.operands.push((Operand::Borrowed(operand), Some(map.to_vec())));
        self
    }

    /// Add a scalar operand; it is lifted to a rank-0 array.
    pub fn and_scalar<N: Numeric>(mut self, value: N) -> Self {
        self.operands.push((Operand::Owned(Array::scalar(value).into_any()), None));
        self
    }

    /// Evaluate in `kind`, converting every operand on read.
    pub fn output_kind(mut self, kind: ElementKind) -> Self {
        self.output_kind = Some(kind);
        self
    }

    /// Match the operands and choose the evaluation kind.
    fn prepare(&self) -> Result<(Plan, ElementKind)> {
        if self.expr.arity() > self.operands.len() {
            return Err(TensorError::InvalidMatchingSpec(format!(
                "expression reads {} operands, {} given",
                self.expr.arity(),
                self.operands.len()
            )));
        }
        let sources: Vec<&dyn CellSource> = self.operands.iter().map(|(o, _)| o.source()).collect();
        let constants = self.expr.constant_kinds();
        let promoted = ElementKind::common(sources.iter().map(|s| s.source_kind()).chain(constants))?;
        let kind = match self.output_kind {
            Some(ElementKind::Ref) => return Err(not_numeric()),
            Some(kind) => kind,
            None => promoted.unwrap_or(ElementKind::F64),
        };
        let shapes: Vec<&[usize]> = sources.iter().map(|s| s.source_shape()).collect();
        let maps: Vec<Option<&[usize]>> = self.operands.iter().map(|(_, m)| m.as_deref()).collect();
        let plan = matching::plan(&shapes, &maps)?;
        debug!(shape = ?plan.shape, %kind, operands = sources.len(), "broadcast planned");
        Ok((plan, kind))
    }

    /// Evaluate one result cell.
    fn cell<T: Numeric>(&self, plan: &Plan, index: &[usize], coords: &mut Vec<usize>, args: &mut Vec<T>) -> Result<T> {
        args.clear();
        for (k, (operand, _)) in self.operands.iter().enumerate() {
            plan.project(k, index, coords);
            args.push(read(operand.source(), coords)?);
        }
        self.expr.eval(args)
    }

    fn evaluate<T: Numeric>(&self, plan: &Plan) -> Result<Array<T>> {
        let mut coords = Vec::new();
        let mut args = Vec::with_capacity(self.operands.len());
        let data = dimension::indices(&plan.shape)
            .map(|ix| self.cell(plan, &ix, &mut coords, &mut args))
            .collect::<Result<Vec<T>>>()?;
        Array::from_shape_vec(&plan.shape, data)
    }

    /// Evaluate the expression for every cell of the result.
    ///
    /// ***Errors*** with the matching errors described in the
    /// [module documentation](self), `UnsupportedValueType` if an operand or
    /// the output kind is `Ref`, `DivisionByZero` from integer division and
    /// `InvalidMatchingSpec` if the expression reads more operands than
    /// were given.
    pub fn apply(&self) -> Result<AnyArray> {
        let (plan, kind) = self.prepare()?;
        let out = match kind {
            ElementKind::Bool => self.evaluate::<bool>(&plan)?.into_any(),
            ElementKind::Char => self.evaluate::<char>(&plan)?.into_any(),
            ElementKind::I8 => self.evaluate::<i8>(&plan)?.into_any(),
            ElementKind::I16 => self.evaluate::<i16>(&plan)?.into_any(),
            ElementKind::I32 => self.evaluate::<i32>(&plan)?.into_any(),
            ElementKind::I64 => self.evaluate::<i64>(&plan)?.into_any(),
            ElementKind::F32 => self.evaluate::<f32>(&plan)?.into_any(),
            ElementKind::F64 => self.evaluate::<f64>(&plan)?.into_any(),
            ElementKind::Ref => return Err(not_numeric()),
        };
        self.attach_ids(&plan, out)
    }

    /// Give the result the ids of the operand it takes its shape from.
    fn attach_ids(&self, plan: &Plan, mut out: AnyArray) -> Result<AnyArray> {
        if let Some(ids) = self.operands[plan.largest].0.source().source_ids() {
            out.set_ids_from(ids.clone())?;
        }
        Ok(out)
    }
}

/// Apply `expr` cell-wise to `operands`, each matched automatically.
///
/// Shorthand for [`Broadcast`] with [`Broadcast::and`] for every operand.
pub fn apply(expr: Expr, operands: &[&dyn CellSource]) -> Result<AnyArray> {
    let mut b = Broadcast::new(expr);
    b.operands = operands.iter().map(|&s| (Operand::Borrowed(s), None)).collect();
    b.apply()
}

impl AnyArray {
    /// Copy of this array with every cell passed through `expr` as operand 0.
    ///
    /// Ids and metadata carry over.
    ///
    /// ***Errors*** like [`Broadcast::apply`].
    pub fn map_expr(&self, expr: Expr) -> Result<AnyArray> {
        let mut out = Broadcast::new(expr).and(self).apply()?;
        *out.metadata_mut() = self.metadata().clone();
        Ok(out)
    }
}

impl fmt::Debug for Broadcast<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcast")
            .field("expr", &self.expr)
            .field("operands", &self.operands.len())
            .field("output_kind", &self.output_kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, LockPolicy, Shell, TensorMut, Value};

    #[test]
    fn promotes_to_common_kind() {
        let a = Array::from_shape_vec([2], vec![100i8, -3]).unwrap();
        let b = Array::from_shape_vec([2], vec![1000i32, 7]).unwrap();
        let c = Broadcast::new(Expr::arg(0) * Expr::arg(1)).and(&a).and(&b).apply().unwrap();
        assert_eq!(c.kind(), ElementKind::I32);
        assert_eq!(c.downcast::<i32>().unwrap().into_raw_vec(), vec![100_000, -21]);
    }

    #[test]
    fn output_kind_converts_inputs() {
        let a = Array::from_shape_vec([2], vec![2.6f64, -1.6]).unwrap();
        let r = Broadcast::new(Expr::arg(0) + Expr::arg(0)).and(&a).output_kind(ElementKind::I32).apply().unwrap();
        // converted before the sum: 2 + 2, -1 + -1
        assert_eq!(r.downcast::<i32>().unwrap().into_raw_vec(), vec![4, -2]);
    }

    #[test]
    fn identity_keeps_kind() {
        for kind in [ElementKind::Bool, ElementKind::Char, ElementKind::I16, ElementKind::F32] {
            let a = crate::allocate([2, 2], kind);
            let r = Broadcast::new(Expr::arg(0)).and(&a).apply().unwrap();
            assert_eq!(r, a);
        }
    }

    #[test]
    fn scalars_and_views() {
        let a = Array::from_shape_fn([2, 3], |ix| (ix[0] * 3 + ix[1]) as i64);
        let col = a.view().collapsed(1, 2).unwrap();
        let r = Broadcast::new(Expr::arg(0) - Expr::arg(1) * Expr::arg(2))
            .and(&a)
            .and(&col)
            .and_scalar(2i8)
            .apply()
            .unwrap();
        assert_eq!(r.kind(), ElementKind::I64);
        assert_eq!(r.values(), [-4i64, -3, -2, -7, -6, -5].map(Value::from).to_vec());

        let shell = Shell::new(Array::from_elem([2, 3], 1.5f32), LockPolicy::PerRow);
        let r = apply(Expr::arg(0) + Expr::arg(1), &[&shell, &a]).unwrap();
        assert_eq!(r.kind(), ElementKind::F32);
        assert_eq!(r.get_value(&[1, 2]).unwrap(), Value::F32(6.5));
    }

    #[test]
    fn failures() {
        let a = Array::<i32>::zeros([2]);
        let refs = Array::<Value>::zeros([2]).into_any();
        let err = Broadcast::new(Expr::arg(0)).and(&refs).apply().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValueType);
        let err = Broadcast::new(Expr::arg(0) / Expr::arg(1)).and(&a).and(&a).apply().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
        let err = Broadcast::new(Expr::arg(1)).and(&a).apply().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMatchingSpec);
        let err = Broadcast::new(Expr::arg(0)).and(&a).output_kind(ElementKind::Ref).apply().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValueType);
    }

    #[test]
    fn map_expr_keeps_ids() {
        let mut a = Array::from_shape_vec([2], vec![4.0f64, 9.]).unwrap().with_ids(vec![vec!["p", "q"]]).unwrap();
        a.metadata_mut().insert("unit".into(), "m2".into());
        let r = a.into_any().map_expr(Expr::arg(0).sqrt()).unwrap();
        assert_eq!(r.values(), vec![Value::F64(2.), Value::F64(3.)]);
        assert_eq!(r.metadata()["unit"], Value::from("m2"));
        assert_eq!(r.ids().unwrap().key(0, 1), Some(&Value::from("q")));
    }
}
