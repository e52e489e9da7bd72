// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Dimension matching of operands onto the result shape.

use tracing::trace;

use crate::error::{shape_mismatch, Result, TensorError};

/// The result shape and, per operand, the result dimension that each of its
/// dimensions follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Plan {
    pub shape: Vec<usize>,
    /// The operand the result shape is taken from.
    pub largest: usize,
    pub maps: Vec<Vec<usize>>,
}

impl Plan {
    /// Write the coordinates of operand `k` for result cell `index`.
    #[inline]
    pub fn project(&self, k: usize, index: &[usize], out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.maps[k].iter().map(|&d| index[d]));
    }
}

/// Match every operand onto the largest one.
///
/// The largest operand is the first one of maximal rank; the result has its
/// shape. An operand of equal rank must have an identical shape. A smaller
/// operand follows its explicit mapping if given, else its dimension `i`
/// follows dimension `i` of the largest operand.
pub(crate) fn plan(shapes: &[&[usize]], explicit: &[Option<&[usize]>]) -> Result<Plan> {
    let largest = shapes
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, s)| s.len())
        .map(|(k, _)| k)
        .ok_or_else(|| TensorError::InvalidMatchingSpec("no operands".into()))?;
    let target = shapes[largest];
    let maps = shapes
        .iter()
        .zip(explicit)
        .enumerate()
        .map(|(k, (&shape, map))| match map {
            Some(map) => explicit_map(shape, target, map),
            None if shape.len() == target.len() => {
                if shape != target {
                    return Err(shape_mismatch(target, shape));
                }
                Ok((0..shape.len()).collect())
            }
            None => {
                trace!(operand = k, ?shape, ?target, "matching leading dimensions");
                automatic_map(shape, target)
            }
        })
        .collect::<Result<_>>()?;
    Ok(Plan {
        shape: target.to_vec(),
        largest,
        maps,
    })
}

fn automatic_map(smaller: &[usize], larger: &[usize]) -> Result<Vec<usize>> {
    if smaller.iter().zip(larger).any(|(a, b)| a != b) {
        return Err(TensorError::UnmatchableShape {
            smaller: smaller.to_vec(),
            larger: larger.to_vec(),
        });
    }
    Ok((0..smaller.len()).collect())
}

fn explicit_map(smaller: &[usize], larger: &[usize], map: &[usize]) -> Result<Vec<usize>> {
    let invalid = |msg: String| Err(TensorError::InvalidMatchingSpec(msg));
    if map.len() != smaller.len() {
        return invalid(format!(
            "{:?} has {} entries for an operand of rank {}",
            map,
            map.len(),
            smaller.len()
        ));
    }
    let mut used = vec![false; larger.len()];
    for (i, &d) in map.iter().enumerate() {
        if d >= larger.len() {
            return invalid(format!("target dimension {} out of range for rank {}", d, larger.len()));
        }
        if used[d] {
            return invalid(format!("target dimension {} repeated in {:?}", d, map));
        }
        used[d] = true;
        if smaller[i] != larger[d] {
            return invalid(format!(
                "dimension {} of length {} cannot follow dimension {} of length {}",
                i, smaller[i], d, larger[d]
            ));
        }
    }
    Ok(map.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn kind(shapes: &[&[usize]], explicit: &[Option<&[usize]>]) -> ErrorKind {
        plan(shapes, explicit).unwrap_err().kind()
    }

    #[test]
    fn first_largest_operand_wins() {
        let p = plan(&[&[4], &[4, 2], &[4, 3]], &[None, None, None]);
        assert_eq!(p.unwrap_err().kind(), ErrorKind::ShapeMismatch);
        let p = plan(&[&[], &[4, 2], &[4]], &[None, None, None]).unwrap();
        assert_eq!(p.shape, vec![4, 2]);
        assert_eq!(p.largest, 1);
        assert_eq!(p.maps, vec![vec![], vec![0, 1], vec![0]]);
    }

    #[test]
    fn explicit_mapping() {
        let p = plan(&[&[3, 4, 6], &[6, 3]], &[None, Some(&[2, 0])]).unwrap();
        assert_eq!(p.maps[1], vec![2, 0]);
        let mut out = Vec::new();
        p.project(1, &[1, 2, 5], &mut out);
        assert_eq!(out, vec![5, 1]);

        assert_eq!(kind(&[&[3, 4, 6], &[6, 3]], &[None, None]), ErrorKind::UnmatchableShape);
        let bad: [&[usize]; 4] = [&[2], &[2, 2], &[3, 0], &[1, 0]];
        for map in bad {
            assert_eq!(kind(&[&[3, 4, 6], &[6, 3]], &[None, Some(map)]), ErrorKind::InvalidMatchingSpec);
        }
    }

    #[test]
    fn equal_ranks_permute_explicitly() {
        let p = plan(&[&[2, 3], &[3, 2]], &[None, Some(&[1, 0])]).unwrap();
        assert_eq!(p.shape, vec![2, 3]);
        assert_eq!(kind(&[&[2, 3], &[3, 2]], &[None, None]), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn no_operands() {
        assert_eq!(kind(&[], &[]), ErrorKind::InvalidMatchingSpec);
    }
}
