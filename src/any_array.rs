// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use tracing::warn;

use crate::error::{Result, TensorError};
use crate::index::Ids;
use crate::{Array, Element, ElementKind, Metadata, Numeric, Tensor, TensorMut, Value};

/// An array whose element kind is chosen at run time.
///
/// One variant per [`ElementKind`]; use [`allocate`] to create one from a
/// kind value, [`AnyArray::downcast`] to recover the typed array.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyArray {
    Bool(Array<bool>),
    Char(Array<char>),
    I8(Array<i8>),
    I16(Array<i16>),
    I32(Array<i32>),
    I64(Array<i64>),
    F32(Array<f32>),
    F64(Array<f64>),
    Ref(Array<Value>),
}

/// Evaluate `$body` with `$a` bound to the typed array of any variant.
macro_rules! dispatch {
    ($any:expr, $a:ident => $body:expr) => {
        match $any {
            AnyArray::Bool($a) => $body,
            AnyArray::Char($a) => $body,
            AnyArray::I8($a) => $body,
            AnyArray::I16($a) => $body,
            AnyArray::I32($a) => $body,
            AnyArray::I64($a) => $body,
            AnyArray::F32($a) => $body,
            AnyArray::F64($a) => $body,
            AnyArray::Ref($a) => $body,
        }
    };
}

/// Allocate an array of `kind` filled with the kind's default value.
///
/// ```
/// use ndtensor::{allocate, ElementKind, Value};
///
/// let a = allocate([2, 3], ElementKind::F32);
/// assert_eq!(a.kind(), ElementKind::F32);
/// assert_eq!(a.get_value(&[1, 2]).unwrap(), Value::F32(0.));
/// ```
pub fn allocate(shape: impl AsRef<[usize]>, kind: ElementKind) -> AnyArray {
    let shape = shape.as_ref();
    match kind {
        ElementKind::Bool => AnyArray::Bool(Array::zeros(shape)),
        ElementKind::Char => AnyArray::Char(Array::zeros(shape)),
        ElementKind::I8 => AnyArray::I8(Array::zeros(shape)),
        ElementKind::I16 => AnyArray::I16(Array::zeros(shape)),
        ElementKind::I32 => AnyArray::I32(Array::zeros(shape)),
        ElementKind::I64 => AnyArray::I64(Array::zeros(shape)),
        ElementKind::F32 => AnyArray::F32(Array::zeros(shape)),
        ElementKind::F64 => AnyArray::F64(Array::zeros(shape)),
        ElementKind::Ref => AnyArray::Ref(Array::zeros(shape)),
    }
}

impl AnyArray {
    pub fn kind(&self) -> ElementKind {
        dispatch!(self, a => a.kind())
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata(&self) -> &Metadata {
        dispatch!(self, a => a.metadata())
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        dispatch!(self, a => a.metadata_mut())
    }

    pub fn ids(&self) -> Option<&Ids> {
        dispatch!(self, a => a.ids())
    }

    /// Attach already built ids.
    ///
    /// ***Errors*** with `ShapeMismatch` if they describe another shape.
    pub fn set_ids_from(&mut self, ids: Ids) -> Result<()> {
        dispatch!(self, a => a.set_ids_from(ids))
    }

    /// Read one cell as a [`Value`].
    pub fn get_value(&self, index: &[usize]) -> Result<Value> {
        dispatch!(self, a => a.get_cell(index).map(|x| x.to_value()))
    }

    /// Write one cell from a [`Value`], converting numeric values to this
    /// array's kind.
    ///
    /// ***Errors*** with `UnsupportedValueType` if the value cannot be
    /// stored in this kind, or like [`TensorMut::set_cell`].
    pub fn set_value(&mut self, index: &[usize], value: &Value) -> Result<()> {
        dispatch!(self, a => {
            let v = Element::from_value(value)?;
            a.set_cell(index, v)
        })
    }

    /// Every cell as a [`Value`], in row major order.
    pub fn values(&self) -> Vec<Value> {
        dispatch!(self, a => a.iter().map(Element::to_value).collect())
    }

    /// Return the typed array if this array holds elements of type `A`.
    pub fn downcast<A: Element>(self) -> Result<Array<A>, AnyArray> {
        A::from_any(self)
    }

    pub fn as_array<A: Element>(&self) -> Option<&Array<A>> {
        A::any_ref(self)
    }

    pub fn as_array_mut<A: Element>(&mut self) -> Option<&mut Array<A>> {
        A::any_mut(self)
    }

    /// Convert every cell to `kind`.
    ///
    /// Numeric kinds convert with `as` semantics: narrowing and float to
    /// integer conversions lose information without error. Ids and metadata
    /// carry over.
    ///
    /// ***Errors*** with `UnsupportedValueType` when converting a `Ref`
    /// array whose values are not representable in `kind`.
    pub fn convert(&self, kind: ElementKind) -> Result<AnyArray> {
        let from = self.kind();
        if from == kind {
            return Ok(self.clone());
        }
        if let (Some(a), Some(b)) = (from.promotion_rank(), kind.promotion_rank()) {
            if b < a {
                warn!(%from, to = %kind, "narrowing element conversion");
            }
        }
        Ok(match self {
            AnyArray::Bool(a) => convert_numeric(a, kind),
            AnyArray::Char(a) => convert_numeric(a, kind),
            AnyArray::I8(a) => convert_numeric(a, kind),
            AnyArray::I16(a) => convert_numeric(a, kind),
            AnyArray::I32(a) => convert_numeric(a, kind),
            AnyArray::I64(a) => convert_numeric(a, kind),
            AnyArray::F32(a) => convert_numeric(a, kind),
            AnyArray::F64(a) => convert_numeric(a, kind),
            AnyArray::Ref(a) => convert_values(a, kind)?,
        })
    }
}

fn convert_numeric<A: Numeric>(a: &Array<A>, kind: ElementKind) -> AnyArray {
    match kind {
        ElementKind::Bool => a.mapv(bool::cast_from).into_any(),
        ElementKind::Char => a.mapv(char::cast_from).into_any(),
        ElementKind::I8 => a.mapv(i8::cast_from).into_any(),
        ElementKind::I16 => a.mapv(i16::cast_from).into_any(),
        ElementKind::I32 => a.mapv(i32::cast_from).into_any(),
        ElementKind::I64 => a.mapv(i64::cast_from).into_any(),
        ElementKind::F32 => a.mapv(f32::cast_from).into_any(),
        ElementKind::F64 => a.mapv(f64::cast_from).into_any(),
        ElementKind::Ref => a.mapv(|x| x.to_value()).into_any(),
    }
}

fn convert_values(a: &Array<Value>, kind: ElementKind) -> Result<AnyArray> {
    fn each<B: Element>(a: &Array<Value>) -> Result<AnyArray> {
        let cells = a.iter().map(B::from_value).collect::<Result<Vec<B>>>()?;
        let mut out = Array::from_shape_vec(a.shape(), cells)?;
        *out.metadata_mut() = a.metadata().clone();
        if let Some(ids) = a.ids() {
            out.set_ids_from(ids.clone())?;
        }
        Ok(out.into_any())
    }
    match kind {
        ElementKind::Bool => each::<bool>(a),
        ElementKind::Char => each::<char>(a),
        ElementKind::I8 => each::<i8>(a),
        ElementKind::I16 => each::<i16>(a),
        ElementKind::I32 => each::<i32>(a),
        ElementKind::I64 => each::<i64>(a),
        ElementKind::F32 => each::<f32>(a),
        ElementKind::F64 => each::<f64>(a),
        ElementKind::Ref => Err(TensorError::UnsupportedValueType(
            "conversion from Ref to Ref".into(),
        )),
    }
}

impl<A: Element> From<Array<A>> for AnyArray {
    fn from(array: Array<A>) -> AnyArray {
        array.into_any()
    }
}
