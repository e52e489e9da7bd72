// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::ops::{Index as OpsIndex, IndexMut};
use std::slice;

use crate::dimension::{self, size_of_shape, Indices};
use crate::error::{shape_mismatch, Result, TensorError};
use crate::index::Ids;
use crate::views::{KeyedOuterIter, OuterIter, View, ViewMut};
use crate::{AnyArray, Element, ElementKind, Metadata, Order, Value};

/// Read access to the cells of an N-dimensional array.
///
/// Implemented by [`Array`], views ([`View`], [`ViewMut`]) and the lock
/// guarded [`Shell`](crate::Shell), so code written against `Tensor` works
/// with any of them.
pub trait Tensor {
    /// The element type.
    type Elem: Element;

    /// The size of every dimension.
    fn shape(&self) -> &[usize];

    /// Read one cell.
    ///
    /// ***Errors*** with `RankMismatch` if `index.len()` is not the rank and
    /// `IndexOutOfRange` if a coordinate is outside its dimension.
    fn get_cell(&self, index: &[usize]) -> Result<Self::Elem>;

    /// Metadata attached to this tensor.
    fn metadata(&self) -> &Metadata;

    /// The id keys of this tensor, if it has any.
    fn ids(&self) -> Option<&Ids> {
        None
    }

    #[inline]
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of cells.
    #[inline]
    fn len(&self) -> usize {
        size_of_shape(self.shape())
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn kind(&self) -> ElementKind {
        Self::Elem::KIND
    }

    /// Every cell in row major order (last coordinate fastest).
    fn get_all_cells(&self) -> Vec<Self::Elem> {
        self.cells(Order::RowMajor)
    }

    /// Every cell in the given traversal order.
    ///
    /// # Panics
    ///
    /// If `get_cell` fails for an index within `shape`.
    fn cells(&self, order: Order) -> Vec<Self::Elem> {
        Indices::new(self.shape(), order)
            .map(|ix| {
                self.get_cell(&ix)
                    .expect("get_cell succeeds for every index within the tensor's shape")
            })
            .collect()
    }

    /// Read one cell by one id key per dimension.
    ///
    /// ***Errors*** with `KeyNotFound` if the tensor has no ids or a key is
    /// not present.
    fn get_by_key(&self, keys: &[Value]) -> Result<Self::Elem> {
        let index = resolve_keys(self.ids(), keys)?;
        self.get_cell(&index)
    }

    /// A read-only view of the whole tensor.
    fn view(&self) -> View<'_, Self>
    where
        Self: Sized,
    {
        View::new(self)
    }

    /// Iterate over the sub-tensors along the first dimension, in order.
    ///
    /// Each item is a view of rank `ndim - 1`. A rank-0 tensor yields
    /// nothing.
    fn outer_iter(&self) -> OuterIter<'_, Self>
    where
        Self: Sized,
    {
        OuterIter::new(self)
    }

    /// Like [`outer_iter`](Tensor::outer_iter), pairing each sub-tensor
    /// with its dimension-0 key.
    ///
    /// Return `None` if the tensor has no ids or has rank 0.
    fn keyed_outer_iter(&self) -> Option<KeyedOuterIter<'_, Self>>
    where
        Self: Sized,
    {
        KeyedOuterIter::new(self)
    }
}

/// Write access to the cells of an N-dimensional array.
pub trait TensorMut: Tensor {
    /// Write one cell.
    ///
    /// ***Errors*** like [`Tensor::get_cell`].
    fn set_cell(&mut self, index: &[usize], value: Self::Elem) -> Result<()>;

    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Overwrite every cell from `values` in row major order.
    ///
    /// ***Errors*** with `ShapeMismatch` if `values` does not hold exactly
    /// one value per cell.
    fn set_all_cells(&mut self, values: &[Self::Elem]) -> Result<()> {
        if values.len() != self.len() {
            return Err(shape_mismatch(&[self.len()], &[values.len()]));
        }
        let shape = self.shape().to_vec();
        for (ix, v) in Indices::new(&shape, Order::RowMajor).zip(values) {
            self.set_cell(&ix, v.clone())?;
        }
        Ok(())
    }

    /// Write one cell by one id key per dimension.
    fn set_by_key(&mut self, keys: &[Value], value: Self::Elem) -> Result<()> {
        let index = resolve_keys(self.ids(), keys)?;
        self.set_cell(&index, value)
    }

    /// A read-write view of the whole tensor.
    fn view_mut(&mut self) -> ViewMut<'_, Self>
    where
        Self: Sized,
    {
        ViewMut::new(self)
    }
}

pub(crate) fn resolve_keys(ids: Option<&Ids>, keys: &[Value]) -> Result<Vec<usize>> {
    match ids {
        Some(ids) => ids.resolve(keys),
        None => Err(TensorError::KeyNotFound {
            dim: 0,
            key: keys.first().map(Value::to_string).unwrap_or_default(),
        }),
    }
}

/// An owned, homogeneous N-dimensional array.
///
/// Cells are stored contiguously in row major order. The rank is the
/// run-time length of the shape; a rank-0 array holds one cell.
///
/// ```
/// use ndtensor::{Array, Tensor, TensorMut};
///
/// let mut a = Array::<i32>::zeros([5, 6]);
/// a.set_cell(&[0, 0], -4).unwrap();
/// assert_eq!(a.get_cell(&[0, 0]).unwrap(), -4);
/// assert_eq!(a[[4, 5]], 0);
/// ```
#[derive(Clone, Debug)]
pub struct Array<A> {
    data: Vec<A>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    metadata: Metadata,
    ids: Option<Ids>,
}

impl<A: Element> Array<A> {
    /// Create an array with every cell set to `elem`.
    pub fn from_elem(shape: impl AsRef<[usize]>, elem: A) -> Self {
        let shape = shape.as_ref();
        Array::from_parts(vec![elem; size_of_shape(shape)], shape)
    }

    /// Create an array filled with the kind's default value (zero, `false`,
    /// `'\0'` or `Value::Null`).
    pub fn zeros(shape: impl AsRef<[usize]>) -> Self {
        Array::from_elem(shape, A::zero())
    }

    /// Create a rank-0 array holding `elem`.
    pub fn scalar(elem: A) -> Self {
        Array::from_parts(vec![elem], &[])
    }

    /// Create an array from cells given in row major order.
    ///
    /// ***Errors*** with `ShapeMismatch` if `v.len()` is not the number of
    /// cells of `shape`.
    pub fn from_shape_vec(shape: impl AsRef<[usize]>, v: Vec<A>) -> Result<Self> {
        let shape = shape.as_ref();
        if v.len() != size_of_shape(shape) {
            return Err(shape_mismatch(&[size_of_shape(shape)], &[v.len()]));
        }
        Ok(Array::from_parts(v, shape))
    }

    /// Create an array by calling `f` with the index of every cell, in row
    /// major order.
    pub fn from_shape_fn<F>(shape: impl AsRef<[usize]>, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> A,
    {
        let shape = shape.as_ref();
        let data = dimension::indices(shape).map(|ix| f(&ix)).collect();
        Array::from_parts(data, shape)
    }

    fn from_parts(data: Vec<A>, shape: &[usize]) -> Self {
        Array::from_raw_parts(data, shape, Metadata::new(), None)
    }

    // Caller guarantees `data` and `ids` fit `shape`.
    pub(crate) fn from_raw_parts(
        data: Vec<A>,
        shape: &[usize],
        metadata: Metadata,
        ids: Option<Ids>,
    ) -> Self {
        debug_assert_eq!(data.len(), size_of_shape(shape));
        Array {
            data,
            shape: shape.to_vec(),
            strides: dimension::default_strides(shape),
            metadata,
            ids,
        }
    }

    /// Return a reference to the cell at `index`, or `None` if out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&A> {
        let off = dimension::checked_offset(&self.shape, &self.strides, index).ok()?;
        self.data.get(off)
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut A> {
        let off = dimension::checked_offset(&self.shape, &self.strides, index).ok()?;
        self.data.get_mut(off)
    }

    /// The cells in row major order.
    pub fn as_slice(&self) -> &[A] {
        &self.data
    }

    pub fn as_slice_mut(&mut self) -> &mut [A] {
        &mut self.data
    }

    /// Iterate over the cells in row major order.
    pub fn iter(&self) -> slice::Iter<'_, A> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, A> {
        self.data.iter_mut()
    }

    /// Return the cells in row major order, discarding shape, ids and
    /// metadata.
    pub fn into_raw_vec(self) -> Vec<A> {
        self.data
    }

    pub(crate) fn into_raw_parts(self) -> (Vec<A>, Vec<usize>, Metadata, Option<Ids>) {
        (self.data, self.shape, self.metadata, self.ids)
    }

    /// Set every cell to `elem`.
    pub fn fill(&mut self, elem: A) {
        self.data.iter_mut().for_each(|x| *x = elem.clone());
    }

    /// Call `f` by value on each cell and return a new array of the results.
    ///
    /// Ids and metadata carry over to the result.
    pub fn mapv<B, F>(&self, mut f: F) -> Array<B>
    where
        B: Element,
        F: FnMut(A) -> B,
    {
        Array {
            data: self.data.iter().cloned().map(&mut f).collect(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            metadata: self.metadata.clone(),
            ids: self.ids.clone(),
        }
    }

    /// Insert one metadata entry, builder style.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach id keys, one sequence per dimension.
    ///
    /// ***Errors*** like [`Ids::new`].
    pub fn set_ids<I, J, K>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        self.ids = Some(Ids::new(keys, &self.shape)?);
        Ok(())
    }

    /// Attach already built ids.
    ///
    /// ***Errors*** with `ShapeMismatch` if they describe another shape.
    pub fn set_ids_from(&mut self, ids: Ids) -> Result<()> {
        let shape = ids.shape();
        if shape != self.shape {
            return Err(shape_mismatch(&self.shape, &shape));
        }
        self.ids = Some(ids);
        Ok(())
    }

    pub fn with_ids<I, J, K>(mut self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        self.set_ids(keys)?;
        Ok(self)
    }

    pub fn clear_ids(&mut self) -> Option<Ids> {
        self.ids.take()
    }

    /// Erase the element type.
    pub fn into_any(self) -> AnyArray {
        A::into_any(self)
    }
}

impl<A: Element> Tensor for Array<A> {
    type Elem = A;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn get_cell(&self, index: &[usize]) -> Result<A> {
        let off = dimension::checked_offset(&self.shape, &self.strides, index)?;
        Ok(self.data[off].clone())
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn ids(&self) -> Option<&Ids> {
        self.ids.as_ref()
    }

    fn get_all_cells(&self) -> Vec<A> {
        self.data.clone()
    }
}

impl<A: Element> TensorMut for Array<A> {
    fn set_cell(&mut self, index: &[usize], value: A) -> Result<()> {
        let off = dimension::checked_offset(&self.shape, &self.strides, index)?;
        self.data[off] = value;
        Ok(())
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn set_all_cells(&mut self, values: &[A]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(shape_mismatch(&[self.data.len()], &[values.len()]));
        }
        self.data.clone_from_slice(values);
        Ok(())
    }
}

/// Arrays compare equal when their shapes and cells are equal; ids and
/// metadata are not compared.
impl<A: PartialEq> PartialEq for Array<A> {
    fn eq(&self, rhs: &Array<A>) -> bool {
        self.shape == rhs.shape && self.data == rhs.data
    }
}

#[cold]
#[inline(never)]
fn array_out_of_bounds() -> ! {
    panic!("ndtensor: index out of bounds");
}

/// Access the cell at `index`.
///
/// ***Panics*** if the index is out of bounds.
impl<A: Element, I: AsRef<[usize]>> OpsIndex<I> for Array<A> {
    type Output = A;

    fn index(&self, index: I) -> &A {
        self.get(index.as_ref()).unwrap_or_else(|| array_out_of_bounds())
    }
}

impl<A: Element, I: AsRef<[usize]>> IndexMut<I> for Array<A> {
    fn index_mut(&mut self, index: I) -> &mut A {
        match self.get_mut(index.as_ref()) {
            Some(v) => v,
            None => array_out_of_bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn rank_zero_holds_one_cell() {
        let mut a = Array::scalar(2.5f64);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get_cell(&[]).unwrap(), 2.5);
        a.set_cell(&[], 1.).unwrap();
        assert_eq!(a.get_all_cells(), vec![1.]);
        assert_eq!(Array::<i8>::zeros([]).len(), 1);
    }

    #[test]
    fn bounds_and_rank_errors() {
        let mut a = Array::<i16>::zeros([2, 3]);
        assert_eq!(a.get_cell(&[2, 0]).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(a.set_cell(&[0, 3], 1).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(a.get_cell(&[0]).unwrap_err().kind(), ErrorKind::RankMismatch);
        assert_eq!(a.set_cell(&[0, 0, 0], 1).unwrap_err().kind(), ErrorKind::RankMismatch);
        assert!(a.get(&[1, 3]).is_none());
    }

    #[test]
    fn bulk_transfer_is_row_major() {
        let a = Array::from_shape_fn([2, 3], |ix| (ix[0] * 10 + ix[1]) as i64);
        assert_eq!(a.get_all_cells(), vec![0, 1, 2, 10, 11, 12]);
        assert_eq!(a.cells(Order::ColumnMajor), vec![0, 10, 1, 11, 2, 12]);

        let mut b = Array::<i64>::zeros([2, 3]);
        b.set_all_cells(&a.get_all_cells()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.set_all_cells(&[1, 2]).unwrap_err().kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn from_shape_vec_checks_length() {
        assert!(Array::from_shape_vec([2, 2], vec![1u8 as i32; 4]).is_ok());
        let err = Array::from_shape_vec([2, 2], vec![true; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn keyed_access() {
        let mut a = Array::<f32>::zeros([2, 2])
            .with_ids(vec![vec!["r", "s"], vec!["x", "y"]])
            .unwrap();
        a.set_by_key(&["s".into(), "x".into()], 3.).unwrap();
        assert_eq!(a[[1, 0]], 3.);
        assert_eq!(a.get_by_key(&["s".into(), "x".into()]).unwrap(), 3.);
        let missing = a.get_by_key(&["q".into(), "x".into()]).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::KeyNotFound);

        let plain = Array::<f32>::zeros([2]);
        assert_eq!(plain.get_by_key(&["r".into()]).unwrap_err().kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn mapv_keeps_ids_and_metadata() {
        let a = Array::from_shape_vec([3], vec![1i32, 2, 3])
            .unwrap()
            .with_metadata("unit", "persons")
            .with_ids(vec![vec!['a', 'b', 'c']])
            .unwrap();
        let b = a.mapv(|x| x as f64 / 2.);
        assert_eq!(b.as_slice(), &[0.5, 1., 1.5]);
        assert_eq!(b.metadata()["unit"], Value::from("persons"));
        assert_eq!(b.ids(), a.ids());
    }

    #[test]
    #[should_panic]
    fn index_panics_out_of_bounds() {
        let a = Array::<i32>::zeros([2]);
        let _ = a[[2]];
    }
}
