// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::ops::Range;

use super::Index;
use crate::error::{Result, TensorError};
use crate::Value;

/// Per-dimension id keys.
///
/// For each dimension, an ordered sequence of unique keys whose positions are
/// the logical coordinates of that dimension.
///
/// ```
/// use ndtensor::Ids;
///
/// let ids = Ids::new(vec![vec!["a", "b"], vec!["x", "y", "z"]], &[2, 3]).unwrap();
/// assert_eq!(ids.position(1, &"z".into()).unwrap(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Ids {
    keys: Vec<Vec<Value>>,
    lookup: Vec<HashMap<Value, usize>>,
}

impl Ids {
    /// Create ids for an index of `shape`.
    ///
    /// ***Errors*** with `RankMismatch` if there is not one key sequence per
    /// dimension, `KeyCountMismatch` if a sequence's length differs from its
    /// dimension's size and `DuplicateKey` if a sequence repeats a key.
    pub fn new<I, J, K>(keys: I, shape: &[usize]) -> Result<Self>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        let keys: Vec<Vec<Value>> = keys
            .into_iter()
            .map(|dim| dim.into_iter().map(Into::into).collect())
            .collect();
        if keys.len() != shape.len() {
            return Err(TensorError::RankMismatch {
                expected: shape.len(),
                found: keys.len(),
            });
        }
        let mut lookup = Vec::with_capacity(keys.len());
        for (dim, (dim_keys, &len)) in keys.iter().zip(shape).enumerate() {
            if dim_keys.len() != len {
                return Err(TensorError::KeyCountMismatch {
                    dim,
                    expected: len,
                    found: dim_keys.len(),
                });
            }
            let mut positions = HashMap::with_capacity(len);
            for (i, key) in dim_keys.iter().enumerate() {
                if positions.insert(key.clone(), i).is_some() {
                    return Err(TensorError::DuplicateKey {
                        dim,
                        key: key.to_string(),
                    });
                }
            }
            lookup.push(positions);
        }
        Ok(Ids { keys, lookup })
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.keys.len()
    }

    /// The shape these ids describe.
    pub fn shape(&self) -> Vec<usize> {
        self.keys.iter().map(Vec::len).collect()
    }

    /// The keys of dimension `dim`, in coordinate order.
    pub fn keys(&self, dim: usize) -> &[Value] {
        &self.keys[dim]
    }

    /// The key at coordinate `pos` of dimension `dim`.
    pub fn key(&self, dim: usize, pos: usize) -> Option<&Value> {
        self.keys.get(dim)?.get(pos)
    }

    /// The logical coordinate of `key` in dimension `dim`.
    pub fn position(&self, dim: usize, key: &Value) -> Result<usize> {
        self.lookup
            .get(dim)
            .and_then(|l| l.get(key))
            .copied()
            .ok_or_else(|| TensorError::KeyNotFound {
                dim,
                key: key.to_string(),
            })
    }

    /// Resolve one key per dimension to a full coordinate.
    pub fn resolve(&self, keys: &[Value]) -> Result<Vec<usize>> {
        if keys.len() != self.ndim() {
            return Err(TensorError::RankMismatch {
                expected: self.ndim(),
                found: keys.len(),
            });
        }
        keys.iter().enumerate().map(|(d, k)| self.position(d, k)).collect()
    }

    pub(crate) fn all_keys(&self) -> &[Vec<Value>] {
        &self.keys
    }

    // Keys taken from valid ids stay unique, so derivations skip validation.
    fn from_valid_keys(keys: Vec<Vec<Value>>) -> Self {
        let lookup = keys
            .iter()
            .map(|dim| dim.iter().cloned().zip(0..).collect())
            .collect();
        Ids { keys, lookup }
    }

    /// The ids of a view with permuted dimensions.
    pub(crate) fn permuted(&self, order: &[usize]) -> Self {
        Ids::from_valid_keys(order.iter().map(|&d| self.keys[d].clone()).collect())
    }

    /// The ids of a view with dimension `axis` removed.
    pub(crate) fn collapsed(&self, axis: usize) -> Self {
        let mut keys = self.keys.clone();
        keys.remove(axis);
        Ids::from_valid_keys(keys)
    }

    /// The ids of a view restricted to `range` along `axis`.
    pub(crate) fn sliced(&self, axis: usize, range: Range<usize>) -> Self {
        let mut keys = self.keys.clone();
        keys[axis] = keys[axis][range].to_vec();
        Ids::from_valid_keys(keys)
    }
}

impl PartialEq for Ids {
    fn eq(&self, other: &Ids) -> bool {
        self.keys == other.keys
    }
}

impl Eq for Ids {}

/// An index with id keys layered on top.
#[derive(Clone, Debug)]
pub struct IdIndex<I> {
    inner: I,
    ids: Ids,
}

impl<I: Index> IdIndex<I> {
    /// Attach `ids` to `inner`.
    ///
    /// ***Errors*** with `ShapeMismatch` if the ids do not describe the
    /// index's shape.
    pub fn new(inner: I, ids: Ids) -> Result<Self> {
        let shape = ids.shape();
        if shape != inner.shape() {
            return Err(crate::error::shape_mismatch(inner.shape(), &shape));
        }
        Ok(IdIndex { inner, ids })
    }

    /// The logical coordinate of `key` in dimension `dim`.
    pub fn index_by_key(&self, dim: usize, key: &Value) -> Result<usize> {
        self.ids.position(dim, key)
    }

    pub fn ids(&self) -> &Ids {
        &self.ids
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn into_parts(self) -> (I, Ids) {
        (self.inner, self.ids)
    }
}

impl<I: Index> Index for IdIndex<I> {
    fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    fn index(&self, dim: usize, logical: usize) -> Result<usize> {
        self.inner.index(dim, logical)
    }

    fn is_identity(&self) -> bool {
        self.inner.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ComposedIndex, IdentityIndex};
    use crate::ErrorKind;

    #[test]
    fn construction_errors() {
        let dup = Ids::new(vec![vec!["a", "b", "a"]], &[3]).unwrap_err();
        assert_eq!(dup.kind(), ErrorKind::DuplicateKey);
        assert_eq!(dup.to_string(), "duplicate key a in dimension 0");

        let short = Ids::new(vec![vec![1i32, 2], vec![3]], &[2, 2]).unwrap_err();
        assert!(matches!(
            short,
            TensorError::KeyCountMismatch { dim: 1, expected: 2, found: 1 }
        ));

        let rank = Ids::new(vec![vec![1i32]], &[1, 1]).unwrap_err();
        assert_eq!(rank.kind(), ErrorKind::RankMismatch);
    }

    #[test]
    fn mixed_key_types_in_one_dimension() {
        let keys = vec![vec![Value::from(1i32), Value::from("1"), Value::from(1i64)]];
        let ids = Ids::new(keys, &[3]).unwrap();
        assert_eq!(ids.position(0, &Value::from("1")).unwrap(), 1);
        assert_eq!(ids.position(0, &Value::I64(1)).unwrap(), 2);
        assert_eq!(ids.position(0, &Value::I16(1)).unwrap_err().kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn wraps_any_index() {
        let view = ComposedIndex::identity(&[3, 4]).sliced(1, 1..3).unwrap();
        let ids = Ids::new(vec![vec!["r0", "r1", "r2"], vec!["c1", "c2"]], &[3, 2]).unwrap();
        let ix = IdIndex::new(view, ids).unwrap();
        let col = ix.index_by_key(1, &"c2".into()).unwrap();
        assert_eq!(col, 1);
        assert_eq!(ix.index(1, col).unwrap(), 2);

        let ids = Ids::new(vec![vec!["a"]], &[1]).unwrap();
        let err = IdIndex::new(IdentityIndex::new(&[2]), ids).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn derived_ids_follow_views() {
        let ids = Ids::new(vec![vec!["a", "b", "c"], vec!["x", "y"]], &[3, 2]).unwrap();
        let p = ids.permuted(&[1, 0]);
        assert_eq!(p.shape(), vec![2, 3]);
        assert_eq!(p.position(0, &"y".into()).unwrap(), 1);
        let s = ids.sliced(0, 1..3);
        assert_eq!(s.keys(0), &[Value::from("b"), Value::from("c")][..]);
        assert_eq!(s.position(0, &"c".into()).unwrap(), 1);
        let c = ids.collapsed(0);
        assert_eq!(c.ndim(), 1);
        assert_eq!(c.key(0, 1), Some(&Value::from("y")));
    }
}
