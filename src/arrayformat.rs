// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use std::fmt;

use crate::dimension::Indices;
use crate::{AnyArray, Array, Element, Order, Tensor, View};

fn format_tensor<T, F>(tensor: &T, f: &mut fmt::Formatter<'_>, mut format: F) -> fmt::Result
where
    T: Tensor,
    F: FnMut(&T::Elem, &mut fmt::Formatter<'_>) -> fmt::Result,
{
    let ndim = tensor.ndim();
    let mut last: Option<Vec<usize>> = None;
    for _ in 0..ndim {
        f.write_str("[")?;
    }
    // Coordinate wraparounds tell where rows close and open.
    for index in Indices::new(tensor.shape(), Order::RowMajor) {
        let changed = last
            .as_ref()
            .and_then(|prev| index.iter().zip(prev).take(ndim.saturating_sub(1)).position(|(a, b)| a != b));
        match (changed, &last) {
            (Some(i), _) => {
                let n = ndim - i - 1;
                for _ in 0..n {
                    f.write_str("]")?;
                }
                f.write_str(",\n")?;
                for _ in 0..ndim - n {
                    f.write_str(" ")?;
                }
                for _ in 0..n {
                    f.write_str("[")?;
                }
            }
            (None, Some(_)) => f.write_str(", ")?,
            (None, None) => {}
        }
        if let Ok(elt) = tensor.get_cell(&index) {
            format(&elt, f)?;
        }
        last = Some(index);
    }
    for _ in 0..ndim {
        f.write_str("]")?;
    }
    Ok(())
}

/// Format the array using `Display` and apply the formatting parameters used
/// to each element.
///
/// The array is shown in multiline style.
///
/// ```
/// use ndtensor::Array;
///
/// let a = Array::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
/// assert_eq!(a.to_string(), "[[1, 2],\n [3, 4]]");
/// ```
impl<A: fmt::Display + Element> fmt::Display for Array<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_tensor(self, f, fmt::Display::fmt)
    }
}

/// Format the array using `LowerExp` and apply the formatting parameters used
/// to each element.
impl<A: fmt::LowerExp + Element> fmt::LowerExp for Array<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_tensor(self, f, fmt::LowerExp::fmt)
    }
}

impl<T> fmt::Display for View<'_, T>
where
    T: Tensor,
    T::Elem: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_tensor(self, f, fmt::Display::fmt)
    }
}

impl fmt::Display for AnyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyArray::Bool(a) => fmt::Display::fmt(a, f),
            AnyArray::Char(a) => fmt::Display::fmt(a, f),
            AnyArray::I8(a) => fmt::Display::fmt(a, f),
            AnyArray::I16(a) => fmt::Display::fmt(a, f),
            AnyArray::I32(a) => fmt::Display::fmt(a, f),
            AnyArray::I64(a) => fmt::Display::fmt(a, f),
            AnyArray::F32(a) => fmt::Display::fmt(a, f),
            AnyArray::F64(a) => fmt::Display::fmt(a, f),
            AnyArray::Ref(a) => fmt::Display::fmt(a, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn rank_zero_and_empty() {
        assert_eq!(Array::scalar(1.5f64).to_string(), "1.5");
        assert_eq!(Array::<i32>::zeros([0]).to_string(), "[]");
        assert_eq!(Array::<i32>::zeros([2, 0]).to_string(), "[[]]");
    }

    #[test]
    fn three_dimensions() {
        let a = Array::from_shape_fn([2, 2, 2], |ix| (ix[0] * 4 + ix[1] * 2 + ix[2]) as i8);
        assert_eq!(a.to_string(), "[[[0, 1],\n  [2, 3]],\n [[4, 5],\n  [6, 7]]]");
    }

    #[test]
    fn element_parameters_and_views() {
        let a = Array::from_shape_vec([2], vec![0.3f32, 1.]).unwrap();
        assert_eq!(format!("{:.1}", a), "[0.3, 1.0]");
        assert_eq!(format!("{:e}", a), "[3e-1, 1e0]");
        let v = Array::from_shape_vec([2, 2], vec![1i16, 2, 3, 4]).unwrap();
        assert_eq!(v.view().permuted(&[1, 0]).unwrap().to_string(), "[[1, 3],\n [2, 4]]");
        let any = Array::from_elem([1], Value::from("s")).into_any();
        assert_eq!(any.to_string(), "[s]");
    }
}
