// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use ndtensor::{Array, Element, Indices, Order};

use num_traits::Num;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayBuilder {
    shape: Vec<usize>,
    memory_order: Order,
    generator: ElementGenerator,
}

/// How to generate elements
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElementGenerator {
    /// 0, 1, 2, ... in the traversal order of the builder
    Sequential,
    Zero,
}

impl Default for ArrayBuilder {
    fn default() -> Self {
        Self::new([1])
    }
}

impl ArrayBuilder {
    pub fn new(shape: impl AsRef<[usize]>) -> Self {
        ArrayBuilder {
            shape: shape.as_ref().to_vec(),
            memory_order: Order::C,
            generator: ElementGenerator::Sequential,
        }
    }

    /// The order in which sequential values are assigned to cells.
    pub fn memory_order(mut self, order: Order) -> Self {
        self.memory_order = order;
        self
    }

    pub fn generator(mut self, generator: ElementGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn build<T>(self) -> Array<T>
    where T: Element + Num {
        let mut array = Array::zeros(&self.shape);
        if self.generator == ElementGenerator::Zero {
            return array;
        }
        let mut current = <T as Element>::zero();
        for ix in Indices::new(&self.shape, self.memory_order) {
            array[&ix] = current.clone();
            current = current + T::one();
        }
        array
    }
}

#[test]
fn test_order() {
    use ndtensor::Tensor;

    let (m, n) = (12, 13);
    let c = ArrayBuilder::new([m, n])
        .memory_order(Order::C)
        .build::<i32>();
    let f = ArrayBuilder::new([m, n])
        .memory_order(Order::F)
        .build::<i32>();

    assert_eq!(c.shape(), &[m, n]);
    assert_eq!(f.shape(), &[m, n]);
    assert_eq!(c.get_cell(&[0, 1]).unwrap(), 1);
    assert_eq!(f.get_cell(&[1, 0]).unwrap(), 1);
    assert_eq!(f.get_cell(&[0, 1]).unwrap(), m as i32);
}

#[test]
fn test_zero() {
    let z = ArrayBuilder::new([3, 2])
        .generator(ElementGenerator::Zero)
        .build::<f64>();
    assert!(z.iter().all(|&x| x == 0.));
}
