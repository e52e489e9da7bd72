// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Composed arrays: views that read and write another tensor's storage
//! through a [`ComposedIndex`].

use std::fmt;
use std::ops::Range;

use crate::dimension;
use crate::error::Result;
use crate::index::{ComposedIndex, Ids, Index};
use crate::{Array, Metadata, Tensor, TensorMut, Value};

/// A read-only view of a tensor.
///
/// A view owns no cells; every access is redirected through its index to
/// the parent. Each transform composes with the current index, so
/// `a.view().sliced(..)?.permuted(..)?` still addresses `a` directly.
///
/// The view starts with a copy of the parent's metadata and, if the parent
/// has ids, the ids of the selected coordinates.
pub struct View<'a, T> {
    parent: &'a T,
    index: ComposedIndex,
    metadata: Metadata,
    ids: Option<Ids>,
}

/// A read-write view of a tensor; writes land in the parent's storage.
pub struct ViewMut<'a, T> {
    parent: &'a mut T,
    index: ComposedIndex,
    metadata: Metadata,
    ids: Option<Ids>,
}

// Shared by both views: derive index and ids together.
macro_rules! view_transforms {
    () => {
        /// Reorder the dimensions: dimension `k` of the result is dimension
        /// `order[k]` of this view.
        ///
        /// ***Errors*** with `InvalidViewSpec` if `order` is not a
        /// permutation.
        pub fn permuted(mut self, order: &[usize]) -> Result<Self> {
            self.index = self.index.permuted(order)?;
            self.ids = self.ids.map(|ids| ids.permuted(order));
            Ok(self)
        }

        /// Fix dimension `axis` at `coord`, reducing the rank by one.
        ///
        /// ***Errors*** with `InvalidViewSpec` if `axis` or `coord` is out of
        /// bounds.
        pub fn collapsed(mut self, axis: usize, coord: usize) -> Result<Self> {
            self.index = self.index.collapsed(axis, coord)?;
            self.ids = self.ids.map(|ids| ids.collapsed(axis));
            Ok(self)
        }

        /// Restrict dimension `axis` to `range`.
        ///
        /// ***Errors*** with `InvalidViewSpec` if the range does not fit the
        /// dimension.
        pub fn sliced(mut self, axis: usize, range: Range<usize>) -> Result<Self> {
            self.index = self.index.sliced(axis, range.clone())?;
            self.ids = self.ids.map(|ids| ids.sliced(axis, range));
            Ok(self)
        }

        /// The mapping from this view's coordinates to the parent's.
        pub fn index(&self) -> &ComposedIndex {
            &self.index
        }

        /// Replace this view's ids.
        ///
        /// ***Errors*** like [`Ids::new`].
        pub fn set_ids<I, J, K>(&mut self, keys: I) -> Result<()>
        where
            I: IntoIterator<Item = J>,
            J: IntoIterator<Item = K>,
            K: Into<Value>,
        {
            self.ids = Some(Ids::new(keys, self.index.shape())?);
            Ok(())
        }

        pub fn clear_ids(&mut self) -> Option<Ids> {
            self.ids.take()
        }

        fn physical(&self, logical: &[usize]) -> Result<Vec<usize>> {
            dimension::check_index(self.index.shape(), logical)?;
            let mut out = vec![0; self.index.parent_shape().len()];
            self.index.physical_into(logical, &mut out);
            Ok(out)
        }
    };
}

impl<'a, T: Tensor> View<'a, T> {
    /// The identity view of `parent`.
    pub fn new(parent: &'a T) -> Self {
        View {
            index: ComposedIndex::identity(parent.shape()),
            metadata: parent.metadata().clone(),
            ids: parent.ids().cloned(),
            parent,
        }
    }

    view_transforms!();

    /// Copy the selected cells, ids and metadata into a new owned array.
    pub fn to_owned(&self) -> Array<T::Elem> {
        to_owned(self)
    }
}

impl<'a, T: TensorMut> ViewMut<'a, T> {
    /// The identity view of `parent`.
    pub fn new(parent: &'a mut T) -> Self {
        ViewMut {
            index: ComposedIndex::identity(parent.shape()),
            metadata: parent.metadata().clone(),
            ids: parent.ids().cloned(),
            parent,
        }
    }

    view_transforms!();

    /// Reborrow as a read-only view with the same index.
    pub fn as_view(&self) -> View<'_, T> {
        View {
            parent: &*self.parent,
            index: self.index.clone(),
            metadata: self.metadata.clone(),
            ids: self.ids.clone(),
        }
    }

    /// Set every selected cell to `elem`.
    pub fn fill(&mut self, elem: T::Elem) -> Result<()> {
        for ix in dimension::indices(self.index.shape()) {
            self.set_cell(&ix, elem.clone())?;
        }
        Ok(())
    }

    pub fn to_owned(&self) -> Array<T::Elem> {
        to_owned(self)
    }
}

fn to_owned<V: Tensor>(view: &V) -> Array<V::Elem> {
    let ids = view.ids().cloned();
    debug_assert!(ids.as_ref().map_or(true, |ids| ids.shape() == view.shape()));
    Array::from_raw_parts(view.get_all_cells(), view.shape(), view.metadata().clone(), ids)
}

impl<T: Tensor> Tensor for View<'_, T> {
    type Elem = T::Elem;

    fn shape(&self) -> &[usize] {
        self.index.shape()
    }

    fn get_cell(&self, index: &[usize]) -> Result<T::Elem> {
        self.parent.get_cell(&self.physical(index)?)
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn ids(&self) -> Option<&Ids> {
        self.ids.as_ref()
    }
}

impl<T: TensorMut> Tensor for ViewMut<'_, T> {
    type Elem = T::Elem;

    fn shape(&self) -> &[usize] {
        self.index.shape()
    }

    fn get_cell(&self, index: &[usize]) -> Result<T::Elem> {
        self.parent.get_cell(&self.physical(index)?)
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn ids(&self) -> Option<&Ids> {
        self.ids.as_ref()
    }
}

impl<T: TensorMut> TensorMut for ViewMut<'_, T> {
    fn set_cell(&mut self, index: &[usize], value: T::Elem) -> Result<()> {
        let physical = self.physical(index)?;
        self.parent.set_cell(&physical, value)
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl<T> Clone for View<'_, T> {
    fn clone(&self) -> Self {
        View {
            parent: self.parent,
            index: self.index.clone(),
            metadata: self.metadata.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl<T: Tensor> fmt::Debug for View<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("shape", &self.shape())
            .field("index", &self.index)
            .finish()
    }
}

impl<T: TensorMut> fmt::Debug for ViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewMut")
            .field("shape", &self.shape())
            .field("index", &self.index)
            .finish()
    }
}

/// An iterator over the sub-tensors along the first dimension.
///
/// Created by [`Tensor::outer_iter`]. Items are views of rank `ndim - 1`
/// in increasing coordinate order.
pub struct OuterIter<'a, T> {
    parent: &'a T,
    next: usize,
    end: usize,
}

impl<'a, T: Tensor> OuterIter<'a, T> {
    pub(crate) fn new(parent: &'a T) -> Self {
        OuterIter {
            parent,
            next: 0,
            end: parent.shape().first().copied().unwrap_or(0),
        }
    }
}

impl<'a, T: Tensor> Iterator for OuterIter<'a, T> {
    type Item = View<'a, T>;

    fn next(&mut self) -> Option<View<'a, T>> {
        if self.next >= self.end {
            return None;
        }
        let view = View::new(self.parent).collapsed(0, self.next).ok()?;
        self.next += 1;
        Some(view)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.next;
        (len, Some(len))
    }
}

impl<T: Tensor> ExactSizeIterator for OuterIter<'_, T> {}

/// An iterator over `(key, sub-tensor)` pairs along the first dimension of
/// a tensor with ids.
pub struct KeyedOuterIter<'a, T> {
    keys: &'a [Value],
    inner: OuterIter<'a, T>,
}

impl<'a, T: Tensor> KeyedOuterIter<'a, T> {
    /// Pair the outer views of `parent` with its dimension-0 keys.
    ///
    /// Return `None` if `parent` has no ids or has rank 0.
    pub fn new(parent: &'a T) -> Option<Self> {
        let ids = parent.ids()?;
        if ids.ndim() == 0 {
            return None;
        }
        Some(KeyedOuterIter {
            keys: ids.keys(0),
            inner: OuterIter::new(parent),
        })
    }
}

impl<'a, T: Tensor> Iterator for KeyedOuterIter<'a, T> {
    type Item = (&'a Value, View<'a, T>);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.inner.next;
        let view = self.inner.next()?;
        Some((&self.keys[pos], view))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> fmt::Debug for OuterIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OuterIter")
            .field("next", &self.next)
            .field("end", &self.end)
            .finish()
    }
}

impl<T> fmt::Debug for KeyedOuterIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedOuterIter")
            .field("keys", &self.keys)
            .field("inner", &self.inner)
            .finish()
    }
}
