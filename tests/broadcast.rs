// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use ndtensor::prelude::*;
use ndtensor::{apply, indices, CellSource, ErrorKind};
use ndtensor_gen::array_builder::ArrayBuilder;

#[test]
fn explicit_matching_of_a_smaller_operand() {
    let a = ArrayBuilder::new([3, 4, 6]).build::<i32>();
    let b = Array::from_shape_fn([6, 3], |ix| (ix[0] * 100 + ix[1]) as f64);

    let sum = Broadcast::new(Expr::arg(0) + Expr::arg(1))
        .and(&a)
        .and_matched(&b, &[2, 0])
        .apply()
        .unwrap();
    assert_eq!(sum.shape(), &[3, 4, 6]);
    assert_eq!(sum.kind(), ElementKind::F64);
    let sum = sum.as_array::<f64>().unwrap();
    for ix in indices(&[3, 4, 6]) {
        let expected = a[&ix[..]] as f64 + b[[ix[2], ix[0]]];
        assert_eq!(sum[&ix[..]], expected);
    }

    let err = Broadcast::new(Expr::arg(0) + Expr::arg(1))
        .and(&a)
        .and(&b)
        .apply()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmatchableShape);
}

#[test]
fn matching_failures() {
    let a = Array::<i32>::zeros([3, 4]);
    let same_rank = Array::<i32>::zeros([4, 3]);
    let err = apply(Expr::arg(0) * Expr::arg(1), &[&a, &same_rank]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

    let v = Array::<i32>::zeros([4]);
    for map in [&[0][..], &[0, 1][..], &[5][..]] {
        let err = Broadcast::new(Expr::arg(0) + Expr::arg(1))
            .and(&a)
            .and_matched(&v, map)
            .apply()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMatchingSpec, "{:?}", map);
    }
    let ok = Broadcast::new(Expr::arg(0) + Expr::arg(1))
        .and(&a)
        .and_matched(&v, &[1])
        .apply()
        .unwrap();
    assert_eq!(ok.shape(), &[3, 4]);

    let err = Broadcast::new(Expr::arg(0)).apply().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMatchingSpec);
}

#[test]
fn operand_order_does_not_change_the_result() {
    let x = ArrayBuilder::new([3, 4])
        .build::<i16>()
        .with_ids(vec![vec!["a", "b", "c"], vec!["w", "x", "y", "z"]])
        .unwrap();
    let y = Array::from_shape_vec([3], vec![0.5f32, 1.5, 2.5]).unwrap();
    let sum = Expr::arg(0) + Expr::arg(1);
    let xy = Broadcast::new(sum.clone()).and(&x).and(&y).apply().unwrap();
    let yx = Broadcast::new(sum).and(&y).and(&x).apply().unwrap();
    assert_eq!(xy, yx);
    assert_eq!(xy.kind(), ElementKind::F32);
    assert_eq!(xy.get_value(&[1, 2]).unwrap(), Value::F32(7.5));
    // ids come from the operand that gives the shape
    assert_eq!(xy.ids(), x.ids());
    assert_eq!(yx.ids(), x.ids());
}

#[test]
fn kind_promotion() {
    let cases = [
        (ElementKind::Bool, ElementKind::Char, ElementKind::I8),
        (ElementKind::Bool, ElementKind::I16, ElementKind::I16),
        (ElementKind::I8, ElementKind::I64, ElementKind::I64),
        (ElementKind::I32, ElementKind::F32, ElementKind::F32),
        (ElementKind::F32, ElementKind::F64, ElementKind::F64),
    ];
    for (p, q, expected) in cases {
        let a = allocate([2], p);
        let b = allocate([2], q);
        let r = apply(Expr::arg(0) + Expr::arg(1), &[&a, &b]).unwrap();
        assert_eq!(r.kind(), expected, "{} + {}", p, q);
        let r = apply(Expr::arg(0) + Expr::arg(1), &[&b, &a]).unwrap();
        assert_eq!(r.kind(), expected, "{} + {}", q, p);
    }

    let refs = allocate([2], ElementKind::Ref);
    let nums = allocate([2], ElementKind::I32);
    let err = apply(Expr::arg(0) + Expr::arg(1), &[&nums, &refs]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValueType);
}

#[test]
fn constants_take_part_in_promotion() {
    let a = Array::from_shape_vec([3], vec![3i32, -4, 7]).unwrap();
    let half = Broadcast::new(Expr::arg(0) * 0.5).and(&a).apply().unwrap();
    assert_eq!(half.kind(), ElementKind::F64);
    assert_eq!(half.values(), vec![Value::F64(1.5), Value::F64(-2.), Value::F64(3.5)]);

    let twice = Broadcast::new(Expr::arg(0) * 2.).and(&a).apply().unwrap();
    assert_eq!(twice.kind(), ElementKind::I32);
    assert_eq!(twice.values(), vec![Value::I32(6), Value::I32(-8), Value::I32(14)]);

    let small = Array::from_elem([2], 100i8);
    let r = Broadcast::new(Expr::arg(0) + 1000.).and(&small).apply().unwrap();
    assert_eq!(r.kind(), ElementKind::I16);
    assert_eq!(r.get_value(&[1]).unwrap(), Value::I16(1100));

    let r = Broadcast::new(Expr::arg(0) * 0.5)
        .and(&a)
        .output_kind(ElementKind::I32)
        .apply()
        .unwrap();
    assert_eq!(r.kind(), ElementKind::I32);
}

#[test]
fn identity_expression_keeps_kind_and_cells() {
    let a = Array::from_shape_vec([2, 2], vec!['a', 'b', 'c', 'd']).unwrap();
    let r = Broadcast::new(Expr::arg(0)).and(&a).apply().unwrap();
    assert_eq!(r.kind(), ElementKind::Char);
    assert_eq!(r.as_array::<char>(), Some(&a));
}

#[test]
fn scalar_operands() {
    let r = Broadcast::new(Expr::arg(0) + Expr::arg(1))
        .and_scalar(2i32)
        .and_scalar(3.5f64)
        .apply()
        .unwrap();
    assert_eq!(r.ndim(), 0);
    assert_eq!(r.get_value(&[]).unwrap(), Value::F64(5.5));

    let a = ArrayBuilder::new([2, 3]).build::<i64>();
    let r = Broadcast::new(Expr::arg(1) - Expr::arg(0))
        .and(&a)
        .and_scalar(10i8)
        .apply()
        .unwrap();
    assert_eq!(r.kind(), ElementKind::I64);
    assert_eq!(r.values(), (0..6).map(|x| Value::I64(10 - x)).collect::<Vec<_>>());
}

#[test]
fn compound_and_user_functions() {
    let a = Array::from_shape_vec([3], vec![1.0f64, 4., 9.]).unwrap();
    let b = Array::from_shape_vec([3], vec![2.0f64, 2., 2.]).unwrap();
    let c = Array::from_shape_vec([3], vec![-1.0f64, 0., 1.]).unwrap();

    let r = apply((Expr::arg(0).sqrt() * Expr::arg(1)).max(Expr::arg(2)), &[&a, &b, &c]).unwrap();
    assert_eq!(r.values(), vec![Value::F64(2.), Value::F64(4.), Value::F64(6.)]);

    let fma = Expr::nary(|v| v[0] * v[1] + v[2], vec![Expr::arg(0), Expr::arg(1), Expr::arg(2)]);
    let r = apply(fma, &[&a, &b, &c]).unwrap();
    assert_eq!(r.values(), vec![Value::F64(1.), Value::F64(8.), Value::F64(19.)]);
}

#[test]
fn integer_division() {
    let a = Array::from_shape_vec([2], vec![7i32, -7]).unwrap();
    let b = Array::from_shape_vec([2], vec![2i32, 2]).unwrap();
    let q = apply(Expr::arg(0) / Expr::arg(1), &[&a, &b]).unwrap();
    assert_eq!(q.values(), vec![Value::I32(3), Value::I32(-3)]);
    let r = apply(Expr::arg(0) % Expr::arg(1), &[&a, &b]).unwrap();
    assert_eq!(r.values(), vec![Value::I32(1), Value::I32(-1)]);

    let zero = Array::<i32>::zeros([2]);
    let err = apply(Expr::arg(0) % Expr::arg(1), &[&a, &zero]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivisionByZero);

    let fa = Array::from_shape_vec([1], vec![1.0f64]).unwrap();
    let fz = Array::<f64>::zeros([1]);
    let inf = apply(Expr::arg(0) / Expr::arg(1), &[&fa, &fz]).unwrap();
    assert_eq!(inf.get_value(&[0]).unwrap(), Value::F64(f64::INFINITY));
}

#[test]
fn views_and_any_arrays_as_operands() {
    let a = ArrayBuilder::new([4, 3]).build::<i32>();
    let t = a.view().permuted(&[1, 0]).unwrap();
    let any = ArrayBuilder::new([3, 4]).build::<i32>().into_any();
    assert_eq!(any.source_shape(), &[3, 4]);
    let r = Broadcast::new(Expr::arg(0) - Expr::arg(1)).and(&t).and(&any).apply().unwrap();
    // t[i, j] = 3j + i, any[i, j] = 4i + j
    for ix in indices(&[3, 4]) {
        let expected = (3 * ix[1] + ix[0]) as i32 - (4 * ix[0] + ix[1]) as i32;
        assert_eq!(r.get_value(&ix).unwrap(), Value::I32(expected));
    }
}
