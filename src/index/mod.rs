// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Logical to physical coordinate mapping.
//!
//! Every cell accessor goes through an index before touching storage:
//!
//! - [`IdentityIndex`]: physical equals logical; the index of every owned
//!   [`Array`](crate::Array).
//! - [`ComposedIndex`]: the index of a view, built from a parent shape by
//!   permuting, collapsing and slicing dimensions.
//! - [`MappedIndex`]: one lookup table per dimension; what a container
//!   index entry reads back as.
//! - [`IdIndex`]: wraps any index with per-dimension keys ([`Ids`]).

mod composed;
mod ids;

pub use self::composed::ComposedIndex;
pub use self::ids::{IdIndex, Ids};

use crate::error::{Result, TensorError};

/// Mapping from `(dimension, logical coordinate)` to a physical coordinate.
pub trait Index {
    /// The logical shape addressed through this index.
    fn shape(&self) -> &[usize];

    /// The physical coordinate that `logical` maps to in dimension `dim`.
    ///
    /// ***Errors*** with `RankMismatch` if `dim` is not a dimension of the
    /// index and `IndexOutOfRange` if `logical` is outside it.
    fn index(&self, dim: usize, logical: usize) -> Result<usize>;

    #[inline]
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Return true if every coordinate maps to itself.
    fn is_identity(&self) -> bool {
        false
    }

    /// The physical coordinate of every logical coordinate of `dim`, in order.
    fn table(&self, dim: usize) -> Result<Vec<usize>> {
        let len = *self.shape().get(dim).ok_or(TensorError::RankMismatch {
            expected: self.ndim(),
            found: dim + 1,
        })?;
        (0..len).map(|i| self.index(dim, i)).collect()
    }
}

pub(crate) fn check_coordinate(shape: &[usize], dim: usize, logical: usize) -> Result<()> {
    match shape.get(dim) {
        None => Err(TensorError::RankMismatch {
            expected: shape.len(),
            found: dim + 1,
        }),
        Some(&len) if logical >= len => Err(TensorError::IndexOutOfRange {
            dim,
            index: logical,
            len,
        }),
        Some(_) => Ok(()),
    }
}

/// The index of freshly allocated arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityIndex {
    shape: Vec<usize>,
}

impl IdentityIndex {
    pub fn new(shape: &[usize]) -> Self {
        IdentityIndex { shape: shape.to_vec() }
    }
}

impl Index for IdentityIndex {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn index(&self, dim: usize, logical: usize) -> Result<usize> {
        check_coordinate(&self.shape, dim, logical)?;
        Ok(logical)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// An index with an explicit lookup table per dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedIndex {
    shape: Vec<usize>,
    tables: Vec<Vec<usize>>,
}

impl MappedIndex {
    /// Create an index from one table per dimension; the logical size of
    /// each dimension is the length of its table.
    pub fn new(tables: Vec<Vec<usize>>) -> Self {
        MappedIndex {
            shape: tables.iter().map(Vec::len).collect(),
            tables,
        }
    }

    /// Capture the mapping of any index as tables.
    pub fn from_index<I: Index + ?Sized>(index: &I) -> Result<Self> {
        let tables = (0..index.ndim()).map(|d| index.table(d)).collect::<Result<_>>()?;
        Ok(MappedIndex::new(tables))
    }
}

impl Index for MappedIndex {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn index(&self, dim: usize, logical: usize) -> Result<usize> {
        check_coordinate(&self.shape, dim, logical)?;
        Ok(self.tables[dim][logical])
    }

    fn is_identity(&self) -> bool {
        self.tables
            .iter()
            .all(|t| t.iter().enumerate().all(|(i, &p)| i == p))
    }

    fn table(&self, dim: usize) -> Result<Vec<usize>> {
        self.tables.get(dim).cloned().ok_or(TensorError::RankMismatch {
            expected: self.ndim(),
            found: dim + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn identity() {
        let ix = IdentityIndex::new(&[3, 2]);
        assert!(ix.is_identity());
        assert_eq!(ix.index(0, 2).unwrap(), 2);
        assert_eq!(ix.index(1, 2).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(ix.index(2, 0).unwrap_err().kind(), ErrorKind::RankMismatch);
    }

    #[test]
    fn mapped_captures_a_view() {
        let view = ComposedIndex::identity(&[4, 5])
            .sliced(1, 2..5)
            .unwrap()
            .permuted(&[1, 0])
            .unwrap();
        let mapped = MappedIndex::from_index(&view).unwrap();
        assert_eq!(mapped.shape(), &[3, 4]);
        assert_eq!(mapped.table(0).unwrap(), vec![2, 3, 4]);
        assert_eq!(mapped.table(1).unwrap(), vec![0, 1, 2, 3]);
        assert!(!mapped.is_identity());
        assert!(MappedIndex::from_index(&IdentityIndex::new(&[2, 2])).unwrap().is_identity());
    }
}
