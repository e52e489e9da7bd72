// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::ops::Range;

use super::{check_coordinate, Index};
use crate::error::{Result, TensorError};

/// Where one parent dimension takes its coordinate from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Source {
    /// `logical[axis] + offset`
    Axis { axis: usize, offset: usize },
    /// A collapsed dimension, always at this coordinate.
    Fixed(usize),
}

/// The index of a view: an affine, axis-aligned map from the view's logical
/// coordinates onto the coordinates of a parent tensor.
///
/// Transforms compose: permuting a sliced index yields an index that still
/// addresses the original parent directly, so views of views never stack.
///
/// ```
/// use ndtensor::index::{ComposedIndex, Index};
///
/// // the second row of a 3 × 4 parent, columns 1..3
/// let ix = ComposedIndex::identity(&[3, 4])
///     .collapsed(0, 1).unwrap()
///     .sliced(0, 1..3).unwrap();
/// assert_eq!(ix.shape(), &[2]);
/// assert_eq!(ix.physical(&[1]).unwrap(), vec![1, 2]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedIndex {
    shape: Vec<usize>,
    parent_shape: Vec<usize>,
    sources: Vec<Source>,
}

fn invalid(msg: String) -> TensorError {
    TensorError::InvalidViewSpec(msg)
}

impl ComposedIndex {
    /// The identity view of a parent with `parent_shape`.
    pub fn identity(parent_shape: &[usize]) -> Self {
        ComposedIndex {
            shape: parent_shape.to_vec(),
            parent_shape: parent_shape.to_vec(),
            sources: (0..parent_shape.len())
                .map(|axis| Source::Axis { axis, offset: 0 })
                .collect(),
        }
    }

    pub fn parent_shape(&self) -> &[usize] {
        &self.parent_shape
    }

    /// Reorder the dimensions: dimension `k` of the result is dimension
    /// `order[k]` of `self`.
    ///
    /// ***Errors*** with `InvalidViewSpec` if `order` is not a permutation of
    /// `0..ndim`.
    pub fn permuted(mut self, order: &[usize]) -> Result<Self> {
        let ndim = self.shape.len();
        if order.len() != ndim {
            return Err(invalid(format!(
                "permutation {:?} has {} axes, index has {}",
                order,
                order.len(),
                ndim
            )));
        }
        let mut inverse = vec![usize::MAX; ndim];
        for (new_axis, &old_axis) in order.iter().enumerate() {
            if old_axis >= ndim || inverse[old_axis] != usize::MAX {
                return Err(invalid(format!("{:?} is not a permutation of 0..{}", order, ndim)));
            }
            inverse[old_axis] = new_axis;
        }
        self.shape = order.iter().map(|&a| self.shape[a]).collect();
        for source in &mut self.sources {
            if let Source::Axis { axis, .. } = source {
                *axis = inverse[*axis];
            }
        }
        Ok(self)
    }

    /// Fix dimension `axis` at `coord`, removing it from the logical shape.
    ///
    /// ***Errors*** with `InvalidViewSpec` if `axis` or `coord` is out of
    /// bounds.
    pub fn collapsed(mut self, axis: usize, coord: usize) -> Result<Self> {
        let len = self.axis_len(axis)?;
        if coord >= len {
            return Err(invalid(format!(
                "cannot collapse axis {} of length {} at {}",
                axis, len, coord
            )));
        }
        for source in &mut self.sources {
            if let Source::Axis { axis: a, offset } = *source {
                if a == axis {
                    *source = Source::Fixed(offset + coord);
                } else if a > axis {
                    *source = Source::Axis { axis: a - 1, offset };
                }
            }
        }
        self.shape.remove(axis);
        Ok(self)
    }

    /// Restrict dimension `axis` to the contiguous range `range`.
    ///
    /// ***Errors*** with `InvalidViewSpec` if `axis` is out of bounds or the
    /// range is reversed or exceeds the dimension.
    pub fn sliced(mut self, axis: usize, range: Range<usize>) -> Result<Self> {
        let len = self.axis_len(axis)?;
        if range.start > range.end || range.end > len {
            return Err(invalid(format!(
                "range {:?} does not fit axis {} of length {}",
                range, axis, len
            )));
        }
        for source in &mut self.sources {
            if let Source::Axis { axis: a, offset } = source {
                if *a == axis {
                    *offset += range.start;
                }
            }
        }
        self.shape[axis] = range.end - range.start;
        Ok(self)
    }

    fn axis_len(&self, axis: usize) -> Result<usize> {
        self.shape.get(axis).copied().ok_or_else(|| {
            invalid(format!("axis {} out of bounds for rank {}", axis, self.shape.len()))
        })
    }

    /// Write the parent coordinates of the in-bounds `logical` index into
    /// `out`.
    #[inline]
    pub(crate) fn physical_into(&self, logical: &[usize], out: &mut [usize]) {
        for (o, source) in out.iter_mut().zip(&self.sources) {
            *o = match *source {
                Source::Axis { axis, offset } => logical[axis] + offset,
                Source::Fixed(c) => c,
            };
        }
    }

    /// The parent coordinates of `logical`.
    pub fn physical(&self, logical: &[usize]) -> Result<Vec<usize>> {
        crate::dimension::check_index(&self.shape, logical)?;
        let mut out = vec![0; self.parent_shape.len()];
        self.physical_into(logical, &mut out);
        Ok(out)
    }
}

impl Index for ComposedIndex {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn index(&self, dim: usize, logical: usize) -> Result<usize> {
        check_coordinate(&self.shape, dim, logical)?;
        self.sources
            .iter()
            .find_map(|s| match *s {
                Source::Axis { axis, offset } if axis == dim => Some(logical + offset),
                _ => None,
            })
            .ok_or_else(|| invalid(format!("axis {} has no parent dimension", dim)))
    }

    fn is_identity(&self) -> bool {
        self.shape == self.parent_shape
            && self
                .sources
                .iter()
                .enumerate()
                .all(|(d, s)| *s == Source::Axis { axis: d, offset: 0 })
    }
}
