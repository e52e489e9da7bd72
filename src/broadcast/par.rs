// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parallel evaluation on a caller supplied rayon pool.
//!
//! There is no implicit or global pool: every parallel method takes the
//! [`ThreadPool`] to run on.

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use super::matching::Plan;
use super::Broadcast;
use crate::dimension::{self, size_of_shape};
use crate::error::{Result, TensorError};
use crate::{AnyArray, Array, Element, ElementKind, Numeric, Tensor};

/// # Parallel methods
///
/// These methods require crate feature `rayon`.
impl Broadcast<'_> {
    /// Parallel version of [`apply`](Broadcast::apply), evaluating result
    /// cells on `pool`.
    ///
    /// The result is identical to `apply`; cells are evaluated in arbitrary
    /// order.
    pub fn par_apply(&self, pool: &ThreadPool) -> Result<AnyArray> {
        let (plan, kind) = self.prepare()?;
        debug!(threads = pool.current_num_threads(), "parallel broadcast");
        let out = match kind {
            ElementKind::Bool => self.par_evaluate::<bool>(&plan, pool)?.into_any(),
            ElementKind::Char => self.par_evaluate::<char>(&plan, pool)?.into_any(),
            ElementKind::I8 => self.par_evaluate::<i8>(&plan, pool)?.into_any(),
            ElementKind::I16 => self.par_evaluate::<i16>(&plan, pool)?.into_any(),
            ElementKind::I32 => self.par_evaluate::<i32>(&plan, pool)?.into_any(),
            ElementKind::I64 => self.par_evaluate::<i64>(&plan, pool)?.into_any(),
            ElementKind::F32 => self.par_evaluate::<f32>(&plan, pool)?.into_any(),
            ElementKind::F64 => self.par_evaluate::<f64>(&plan, pool)?.into_any(),
            ElementKind::Ref => {
                return Err(TensorError::UnsupportedValueType("Ref output kind".into()))
            }
        };
        self.attach_ids(&plan, out)
    }

    fn par_evaluate<T: Numeric>(&self, plan: &Plan, pool: &ThreadPool) -> Result<Array<T>> {
        let len = size_of_shape(&plan.shape);
        let ndim = plan.shape.len();
        let data = pool.install(|| {
            (0..len)
                .into_par_iter()
                .map_init(
                    || (vec![0; ndim], Vec::new(), Vec::new()),
                    |(index, coords, args), flat| {
                        dimension::unravel(&plan.shape, flat, index);
                        self.cell(plan, index, coords, args)
                    },
                )
                .collect::<Result<Vec<T>>>()
        })?;
        Array::from_shape_vec(&plan.shape, data)
    }
}

impl<A: Element> Array<A> {
    /// Set every cell to `f(index)`, evaluating on `pool`.
    ///
    /// Workers write disjoint cells, so no locking is involved.
    ///
    /// ```
    /// use ndtensor::Array;
    ///
    /// let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    /// let mut a = Array::<i64>::zeros([3, 4]);
    /// a.par_fill_with(&pool, |ix| (ix[0] * 4 + ix[1]) as i64);
    /// assert_eq!(a.as_slice(), &(0..12).collect::<Vec<i64>>()[..]);
    /// ```
    pub fn par_fill_with<F>(&mut self, pool: &ThreadPool, f: F)
    where
        F: Fn(&[usize]) -> A + Sync + Send,
    {
        let shape = self.shape().to_vec();
        let cells = self.as_slice_mut();
        pool.install(|| {
            cells.par_iter_mut().enumerate().for_each_init(
                || vec![0; shape.len()],
                |index, (flat, cell)| {
                    dimension::unravel(&shape, flat, index);
                    *cell = f(index.as_slice());
                },
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Expr};
    use rayon::ThreadPoolBuilder;

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(3).build().unwrap()
    }

    #[test]
    fn matches_sequential_apply() {
        let a = Array::from_shape_fn([5, 4, 7], |ix| (ix[0] + 2 * ix[1] + 3 * ix[2]) as f32);
        let b = Array::from_shape_fn([7, 5], |ix| ix[0] as i16 - ix[1] as i16);
        let bc = Broadcast::new((Expr::arg(0) * Expr::arg(1)).max(-3.))
            .and(&a)
            .and_matched(&b, &[2, 0]);
        assert_eq!(bc.par_apply(&pool()).unwrap(), bc.apply().unwrap());
    }

    #[test]
    fn errors_propagate() {
        let a = Array::from_shape_fn([64], |ix| ix[0] as i32 % 5);
        let err = Broadcast::new(Expr::arg(0) / Expr::arg(0))
            .and(&a)
            .par_apply(&pool())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
    }

    #[test]
    fn fill_rank_zero_and_empty() {
        let p = pool();
        let mut s = Array::scalar(0i8);
        s.par_fill_with(&p, |ix| ix.len() as i8 + 1);
        assert_eq!(s.as_slice(), &[1]);
        let mut e = Array::<f64>::zeros([0, 3]);
        e.par_fill_with(&p, |_| 1.);
        assert!(e.as_slice().is_empty());
    }
}
