// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Approximate comparison of float arrays.
//!
//! Arrays of different shapes are never approximately equal. Metadata and
//! ids are not compared.

use approx::{AbsDiffEq, RelativeEq, UlpsEq};

use crate::{Array, Element, Tensor};

impl<A> Array<A>
where
    A: Element,
{
    /// A test for equality that uses the elementwise absolute difference to compute the
    /// approximate equality of two arrays.
    ///
    /// **Requires crate feature `"approx"`**
    pub fn abs_diff_eq(&self, other: &Array<A>, epsilon: A::Epsilon) -> bool
    where
        A: AbsDiffEq,
        A::Epsilon: Clone,
    {
        <Self as AbsDiffEq>::abs_diff_eq(self, other, epsilon)
    }

    /// A test for equality that uses an elementwise relative comparison if the values are far
    /// apart; and the absolute difference otherwise.
    ///
    /// **Requires crate feature `"approx"`**
    pub fn relative_eq(&self, other: &Array<A>, epsilon: A::Epsilon, max_relative: A::Epsilon) -> bool
    where
        A: RelativeEq,
        A::Epsilon: Clone,
    {
        <Self as RelativeEq>::relative_eq(self, other, epsilon, max_relative)
    }
}

fn all_cells<A, F>(a: &Array<A>, b: &Array<A>, mut f: F) -> bool
where
    A: Element,
    F: FnMut(&A, &A) -> bool,
{
    a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| f(x, y))
}

/// **Requires crate feature `"approx"`.**
impl<A> AbsDiffEq for Array<A>
where
    A: Element + AbsDiffEq,
    A::Epsilon: Clone,
{
    type Epsilon = A::Epsilon;

    fn default_epsilon() -> A::Epsilon {
        A::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Array<A>, epsilon: A::Epsilon) -> bool {
        all_cells(self, other, |a, b| A::abs_diff_eq(a, b, epsilon.clone()))
    }
}

/// **Requires crate feature `"approx"`.**
impl<A> RelativeEq for Array<A>
where
    A: Element + RelativeEq,
    A::Epsilon: Clone,
{
    fn default_max_relative() -> A::Epsilon {
        A::default_max_relative()
    }

    fn relative_eq(&self, other: &Array<A>, epsilon: A::Epsilon, max_relative: A::Epsilon) -> bool {
        all_cells(self, other, |a, b| {
            A::relative_eq(a, b, epsilon.clone(), max_relative.clone())
        })
    }
}

/// **Requires crate feature `"approx"`.**
impl<A> UlpsEq for Array<A>
where
    A: Element + UlpsEq,
    A::Epsilon: Clone,
{
    fn default_max_ulps() -> u32 {
        A::default_max_ulps()
    }

    fn ulps_eq(&self, other: &Array<A>, epsilon: A::Epsilon, max_ulps: u32) -> bool {
        all_cells(self, other, |a, b| A::ulps_eq(a, b, epsilon.clone(), max_ulps))
    }
}

#[cfg(test)]
mod tests {
    use crate::Array;
    use approx::{
        assert_abs_diff_eq, assert_abs_diff_ne, assert_relative_eq, assert_relative_ne, assert_ulps_eq,
        assert_ulps_ne,
    };

    fn pair() -> (Array<f32>, Array<f32>) {
        let a = Array::from_shape_vec([2, 2], vec![1., 2., -0.000010001, 100000000.]).unwrap();
        let b = Array::from_shape_vec([2, 2], vec![1., 1., -0.000010002, 100000001.]).unwrap();
        (a, b)
    }

    #[test]
    fn abs_diff_eq() {
        let (a, mut b) = pair();
        assert_abs_diff_ne!(a, b);
        b[[0, 1]] = 2.;
        assert_abs_diff_eq!(a, b);

        // Check epsilon.
        let zero = Array::from_elem([1], 0.0f32);
        let tiny = Array::from_elem([1], 1e-40f32);
        assert_abs_diff_eq!(zero, tiny, epsilon = 1e-40f32);
        assert_abs_diff_ne!(zero, tiny, epsilon = 1e-41f32);

        // Make sure we can compare different shapes without failure.
        let c = Array::from_shape_vec([1, 2], vec![1., 2.]).unwrap();
        assert_abs_diff_ne!(a, c);
    }

    #[test]
    fn relative_eq() {
        let (a, mut b) = pair();
        assert_relative_ne!(a, b);
        b[[0, 1]] = 2.;
        assert_relative_eq!(a, b);
        assert!(a.relative_eq(&b, 1e-6, 1e-6));
    }

    #[test]
    fn ulps_eq() {
        let (a, mut b) = pair();
        assert_ulps_ne!(a, b);
        b[[0, 1]] = 2.;
        assert_ulps_eq!(a, b);
    }
}
