// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ndtensor prelude.
//!
//! This module contains the most used types and traits, which you can
//! import easily as a group.
//!
//! ```
//! use ndtensor::prelude::*;
//!
//! let a = Array::<f64>::zeros([2, 3]);
//! assert_eq!(a.ndim(), 2);
//! ```

#[doc(no_inline)]
pub use crate::{allocate, AnyArray, Array, View, ViewMut};

#[doc(no_inline)]
pub use crate::{Element, ElementKind, Numeric, Tensor, TensorMut};

#[doc(no_inline)]
pub use crate::{Broadcast, Expr, LockPolicy, Shell};

#[doc(no_inline)]
pub use crate::{Ids, Metadata, Order, Value};
