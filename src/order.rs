// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Cell traversal order
///
/// Order refers to how a multi-dimensional array's cells are laid out as a
/// linear sequence.
///
/// - `RowMajor`: the last coordinate changes fastest. This is the order of
///   in-memory storage and of every bulk accessor
///   ([`get_all_cells`](crate::Tensor::get_all_cells) and friends).
/// - `ColumnMajor`: the first coordinate changes fastest. The zip tensor
///   container stores cell streams in this order.
///
/// For a 2 × 3 array holding
///
/// ```text
/// 1  2  3
/// 4  5  6
/// ```
///
/// row major traversal yields 1, 2, 3, 4, 5, 6 and column major traversal
/// yields 1, 4, 2, 5, 3, 6.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Order {
    /// Row major or "C" order
    RowMajor,
    /// Column major or "F" order
    ColumnMajor,
}

impl Order {
    /// "C" is an alias for row major ordering
    pub const C: Order = Order::RowMajor;

    /// "F" (for Fortran) is an alias for column major ordering
    pub const F: Order = Order::ColumnMajor;

    /// Return true if input is Order::RowMajor, false otherwise
    #[inline]
    pub fn is_row_major(self) -> bool {
        matches!(self, Order::RowMajor)
    }

    /// Return the transpose: row major becomes column major and vice versa.
    #[inline]
    pub fn transpose(self) -> Order {
        match self {
            Order::RowMajor => Order::ColumnMajor,
            Order::ColumnMajor => Order::RowMajor,
        }
    }
}
