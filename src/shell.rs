// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lock-guarded arrays for concurrent mutation.

use std::fmt;

use itertools::Itertools;
use parking_lot::RwLock;
use tracing::debug;

use crate::dimension::{self, size_of_shape};
use crate::error::{shape_mismatch, Result};
use crate::index::Ids;
use crate::{Array, Element, Metadata, Tensor, TensorMut};

/// Locking granularity of a [`Shell`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LockPolicy {
    /// One lock per cell.
    #[default]
    PerCell,
    /// One lock per run of the last dimension (a "row" of a matrix).
    PerRow,
    /// One lock for the whole array.
    WholeArray,
}

/// An array whose cells can be read and written concurrently through `&self`.
///
/// Storage is split into regions according to the [`LockPolicy`] chosen at
/// construction, each behind its own read-write lock. Cell reads take the
/// read lock of the region holding the cell; cell writes take its write
/// lock. Bulk transfers ([`get_all`](Shell::get_all),
/// [`set_all`](Shell::set_all)) exclude every cell operation for their
/// whole duration, so they never observe a torn state.
///
/// Locks are scoped guards: every path out of an operation, including an
/// error return, releases them.
///
/// ```
/// use ndtensor::{Array, LockPolicy, Shell};
///
/// let shell = Shell::new(Array::<i64>::zeros([4, 4]), LockPolicy::PerRow);
/// std::thread::scope(|s| {
///     for row in 0..4 {
///         let shell = &shell;
///         s.spawn(move || {
///             for col in 0..4 {
///                 shell.set(&[row, col], (row * 4 + col) as i64).unwrap();
///             }
///         });
///     }
/// });
/// assert_eq!(shell.get(&[3, 3]).unwrap(), 15);
/// ```
pub struct Shell<A> {
    regions: Vec<RwLock<Vec<A>>>,
    region_len: usize,
    // Shared by cell operations, exclusive for bulk transfers.
    global: RwLock<()>,
    policy: LockPolicy,
    shape: Vec<usize>,
    strides: Vec<usize>,
    metadata: Metadata,
    ids: Option<Ids>,
}

impl<A: Element> Shell<A> {
    /// Wrap `array`, locking at the granularity of `policy`.
    pub fn new(array: Array<A>, policy: LockPolicy) -> Self {
        let (data, shape, metadata, ids) = array.into_raw_parts();
        let region_len = match policy {
            LockPolicy::PerCell => 1,
            LockPolicy::PerRow => shape.last().copied().unwrap_or(1),
            LockPolicy::WholeArray => data.len(),
        }
        .max(1);
        let regions: Vec<_> = data
            .into_iter()
            .chunks(region_len)
            .into_iter()
            .map(|region| RwLock::new(region.collect()))
            .collect();
        debug!(?policy, ?shape, regions = regions.len(), "shell created");
        Shell {
            regions,
            region_len,
            global: RwLock::new(()),
            policy,
            strides: dimension::default_strides(&shape),
            shape,
            metadata,
            ids,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Read one cell under the read lock of its region.
    ///
    /// ***Errors*** with `RankMismatch` or `IndexOutOfRange` like
    /// [`Tensor::get_cell`].
    pub fn get(&self, index: &[usize]) -> Result<A> {
        let _shared = self.global.read();
        let off = dimension::checked_offset(&self.shape, &self.strides, index)?;
        let region = self.regions[off / self.region_len].read();
        Ok(region[off % self.region_len].clone())
    }

    /// Write one cell under the write lock of its region.
    ///
    /// Concurrent writes to one cell are applied in lock acquisition order.
    pub fn set(&self, index: &[usize], value: A) -> Result<()> {
        self.update(index, |cell| *cell = value)
    }

    /// Modify one cell in place under a single write lock.
    ///
    /// ```
    /// use ndtensor::{Array, LockPolicy, Shell};
    ///
    /// let counter = Shell::new(Array::<i32>::zeros([1]), LockPolicy::PerCell);
    /// std::thread::scope(|s| {
    ///     for _ in 0..8 {
    ///         s.spawn(|| counter.update(&[0], |c| *c += 1).unwrap());
    ///     }
    /// });
    /// assert_eq!(counter.get(&[0]).unwrap(), 8);
    /// ```
    pub fn update<F>(&self, index: &[usize], f: F) -> Result<()>
    where
        F: FnOnce(&mut A),
    {
        let _shared = self.global.read();
        let off = dimension::checked_offset(&self.shape, &self.strides, index)?;
        let mut region = self.regions[off / self.region_len].write();
        f(&mut region[off % self.region_len]);
        Ok(())
    }

    /// Every cell in row major order, read under one exclusive lock.
    pub fn get_all(&self) -> Vec<A> {
        let _exclusive = self.global.write();
        let mut out = Vec::with_capacity(size_of_shape(&self.shape));
        for region in &self.regions {
            out.extend_from_slice(&region.read());
        }
        out
    }

    /// Overwrite every cell from `values` in row major order under one
    /// exclusive lock.
    ///
    /// ***Errors*** with `ShapeMismatch` if `values` does not hold exactly
    /// one value per cell; nothing is written in that case.
    pub fn set_all(&self, values: &[A]) -> Result<()> {
        let len = size_of_shape(&self.shape);
        if values.len() != len {
            return Err(shape_mismatch(&[len], &[values.len()]));
        }
        let _exclusive = self.global.write();
        for (region, chunk) in self.regions.iter().zip(values.chunks(self.region_len)) {
            region.write().clone_from_slice(chunk);
        }
        Ok(())
    }

    /// Unwrap the array.
    pub fn into_inner(self) -> Array<A> {
        let data = self
            .regions
            .into_iter()
            .flat_map(RwLock::into_inner)
            .collect();
        Array::from_raw_parts(data, &self.shape, self.metadata, self.ids)
    }
}

impl<A: Element> Tensor for Shell<A> {
    type Elem = A;

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn get_cell(&self, index: &[usize]) -> Result<A> {
        self.get(index)
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn ids(&self) -> Option<&Ids> {
        self.ids.as_ref()
    }

    fn get_all_cells(&self) -> Vec<A> {
        self.get_all()
    }
}

impl<A: Element> TensorMut for Shell<A> {
    // Exclusive access needs no locking.
    fn set_cell(&mut self, index: &[usize], value: A) -> Result<()> {
        let off = dimension::checked_offset(&self.shape, &self.strides, index)?;
        self.regions[off / self.region_len].get_mut()[off % self.region_len] = value;
        Ok(())
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn set_all_cells(&mut self, values: &[A]) -> Result<()> {
        self.set_all(values)
    }
}

impl<A: Element> From<Array<A>> for Shell<A> {
    fn from(array: Array<A>) -> Self {
        Shell::new(array, LockPolicy::default())
    }
}

impl<A> fmt::Debug for Shell<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("shape", &self.shape)
            .field("policy", &self.policy)
            .field("regions", &self.regions.len())
            .finish()
    }
}
