// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
#![crate_name = "ndtensor"]
#![doc(html_root_url = "https://docs.rs/ndtensor/0.1/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations)]

//! The `ndtensor` crate provides typed N-dimensional arrays with id keyed
//! dimensions, views, lock guarded sharing, cell-wise broadcasting and a
//! binary container format.
//!
//! - [`Array<A>`]: an owned array of one [`Element`] type, with a runtime
//!   rank, row major storage and a [`Metadata`] map. [`AnyArray`] holds an
//!   array of any [`ElementKind`]; [`allocate`] creates one by kind.
//! - [`Tensor`] and [`TensorMut`]: cell access shared by arrays, views and
//!   shells. Every accessor checks the rank and each coordinate.
//! - [`index`]: logical to physical coordinate maps. [`View`] and
//!   [`ViewMut`] read and write a parent through a permuted, collapsed or
//!   sliced index. [`Ids`] name the coordinates of each dimension.
//! - [`Shell`]: an array behind read/write locks with a [`LockPolicy`],
//!   for concurrent mutation.
//! - [`broadcast`]: evaluate an [`Expr`] cell by cell over operands of
//!   different ranks, with numeric type promotion.
//! - [`container`]: the zip tensor format, packing several tensors,
//!   indices and groups of one shape into a random-access file.
//!
//! ## Crate Feature Flags
//!
//! - `rayon`
//!   - Parallel broadcasting and filling on a caller supplied
//!     `rayon::ThreadPool`.
//! - `serde`
//!   - Serialization support for [`Array<A>`] of primitive elements.
//! - `approx`
//!   - Implementations of the `approx` comparison traits for float arrays.
//!
//! ## Example
//!
//! ```
//! use ndtensor::prelude::*;
//!
//! let mut a = Array::<i32>::zeros([5, 6])
//!     .with_ids(vec![
//!         vec!["a", "b", "c", "d", "e"],
//!         vec!["a", "b", "c", "d", "e", "z"],
//!     ])
//!     .unwrap()
//!     .with_metadata("name", "x");
//! a.set_cell(&[0, 0], -4).unwrap();
//! assert_eq!(a.get_by_key(&[Value::from("a"), Value::from("a")]).unwrap(), -4);
//!
//! let twice = Broadcast::new(Expr::arg(0) * 2.).and(&a).apply().unwrap();
//! assert_eq!(twice.get_value(&[0, 0]).unwrap(), Value::I32(-8));
//! ```

mod any_array;
mod array;
mod arrayformat;
#[cfg(feature = "approx")]
mod array_approx;
#[cfg(feature = "serde")]
mod array_serde;
pub mod broadcast;
pub mod container;
mod dimension;
mod element;
mod error;
pub mod index;
mod kind;
mod order;
pub mod prelude;
mod shell;
mod value;
mod views;

pub use crate::any_array::{allocate, AnyArray};
pub use crate::array::{Array, Tensor, TensorMut};
#[cfg(feature = "serde")]
pub use crate::array_serde::ARRAY_FORMAT_VERSION;
pub use crate::broadcast::{apply, Broadcast, CellSource, Expr};
pub use crate::container::{read_tensors, write_tensors, ZipTensorReader, ZipTensorWriter};
pub use crate::dimension::{indices, size_of_shape, Indices};
pub use crate::element::{Element, Numeric};
pub use crate::error::{ErrorKind, Result, TensorError};
pub use crate::index::{Ids, Index};
pub use crate::kind::{ElementKind, KindTag};
pub use crate::order::Order;
pub use crate::shell::{LockPolicy, Shell};
pub use crate::value::{Metadata, Opaque, Value};
pub use crate::views::{KeyedOuterIter, OuterIter, View, ViewMut};
