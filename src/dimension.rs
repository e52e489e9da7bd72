// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shape arithmetic shared by arrays, views, shells and the container.

use crate::error::{Result, TensorError};
use crate::Order;

/// Number of cells addressed by `shape`.
///
/// The empty product is 1: a rank-0 array holds exactly one cell.
#[inline]
pub fn size_of_shape(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Like [`size_of_shape`], but `None` if the product of the nonzero
/// lengths overflows `isize`.
pub fn size_of_shape_checked(shape: &[usize]) -> Option<usize> {
    let nonzero = shape
        .iter()
        .filter(|&&d| d != 0)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
    if nonzero > isize::MAX as usize {
        None
    } else if shape.contains(&0) {
        Some(0)
    } else {
        Some(nonzero)
    }
}

/// Row-major strides for `shape`.
///
/// Shape (a, b, c) => strides (b * c, c, 1)
pub(crate) fn default_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut cum_prod = 1;
    for (s, &d) in strides.iter_mut().zip(shape).rev() {
        *s = cum_prod;
        cum_prod *= d;
    }
    strides
}

/// Check that `index` addresses a cell of `shape`.
pub(crate) fn check_index(shape: &[usize], index: &[usize]) -> Result<()> {
    if index.len() != shape.len() {
        return Err(TensorError::RankMismatch {
            expected: shape.len(),
            found: index.len(),
        });
    }
    for (dim, (&i, &len)) in index.iter().zip(shape).enumerate() {
        if i >= len {
            return Err(TensorError::IndexOutOfRange { dim, index: i, len });
        }
    }
    Ok(())
}

/// Flat offset of an already checked `index`.
#[inline]
pub(crate) fn offset(strides: &[usize], index: &[usize]) -> usize {
    index.iter().zip(strides).map(|(&i, &s)| i * s).sum()
}

/// Checked flat offset of `index` into row-major storage of `shape`.
pub(crate) fn checked_offset(shape: &[usize], strides: &[usize], index: &[usize]) -> Result<usize> {
    check_index(shape, index)?;
    Ok(offset(strides, index))
}

/// Write the row-major coordinates of flat offset `flat` into `index`.
pub(crate) fn unravel(shape: &[usize], mut flat: usize, index: &mut [usize]) {
    for (i, &d) in index.iter_mut().zip(shape).rev() {
        *i = flat % d;
        flat /= d;
    }
}

/// Step `index` to the next cell of `shape` in `order`.
///
/// Return false, leaving `index` zeroed, when `index` was the last cell.
pub(crate) fn advance(shape: &[usize], index: &mut [usize], order: Order) -> bool {
    let step = |i: &mut usize, d: usize| {
        *i += 1;
        if *i == d {
            *i = 0;
            false
        } else {
            true
        }
    };
    match order {
        Order::RowMajor => index.iter_mut().zip(shape).rev().any(|(i, &d)| step(i, d)),
        Order::ColumnMajor => index.iter_mut().zip(shape).any(|(i, &d)| step(i, d)),
    }
}

/// An iterator over every coordinate of a shape.
///
/// Rank 0 yields one empty coordinate; any zero-length dimension yields
/// nothing.
#[derive(Clone, Debug)]
pub struct Indices {
    shape: Vec<usize>,
    order: Order,
    next: Option<Vec<usize>>,
}

impl Indices {
    pub fn new(shape: &[usize], order: Order) -> Self {
        let next = if size_of_shape(shape) == 0 {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Indices {
            shape: shape.to_vec(),
            order,
            next,
        }
    }
}

impl Iterator for Indices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        if advance(&self.shape, &mut following, self.order) {
            self.next = Some(following);
        }
        Some(current)
    }
}

/// Return an iterator of coordinates of `shape` in row major order.
pub fn indices(shape: &[usize]) -> Indices {
    Indices::new(shape, Order::RowMajor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn strides_are_row_major() {
        assert_eq!(default_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(default_strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn column_major_order() {
        let got: Vec<_> = Indices::new(&[2, 3], Order::ColumnMajor).collect();
        assert_eq!(
            got,
            vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1], vec![0, 2], vec![1, 2]]
        );
    }

    #[test]
    fn rank_zero_and_empty() {
        assert_eq!(indices(&[]).count(), 1);
        assert_eq!(indices(&[3, 0, 2]).count(), 0);
    }

    #[test]
    fn bounds() {
        assert!(check_index(&[2, 2], &[1, 1]).is_ok());
        assert!(matches!(
            check_index(&[2, 2], &[1]),
            Err(TensorError::RankMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(
            check_index(&[2, 2], &[0, 2]),
            Err(TensorError::IndexOutOfRange { dim: 1, index: 2, len: 2 })
        ));
    }

    quickcheck! {
        fn row_major_enumeration_matches_offsets(dims: Vec<u8>) -> bool {
            let shape: Vec<usize> = dims.iter().take(4).map(|&d| d as usize % 4 + 1).collect();
            let strides = default_strides(&shape);
            let mut scratch = vec![0; shape.len()];
            indices(&shape).enumerate().all(|(flat, index)| {
                unravel(&shape, flat, &mut scratch);
                offset(&strides, &index) == flat && scratch == index
            })
        }
    }
}
