// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::thread;

use ndtensor::prelude::*;
use ndtensor::ErrorKind;

const POLICIES: [LockPolicy; 3] = [LockPolicy::PerCell, LockPolicy::PerRow, LockPolicy::WholeArray];

#[test]
fn concurrent_updates_are_not_lost() {
    for policy in POLICIES {
        let shell = Shell::new(Array::<i64>::zeros([3, 4]), policy);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for ix in ndtensor::indices(&[3, 4]) {
                        shell.update(&ix, |c| *c += 1).unwrap();
                    }
                });
            }
        });
        assert_eq!(shell.get_all(), vec![8; 12], "{:?}", policy);
    }
}

#[test]
fn readers_see_whole_bulk_writes() {
    let shell = Shell::new(Array::<i32>::zeros([4, 8]), LockPolicy::PerCell);
    let ones = vec![1; 32];
    let twos = vec![2; 32];
    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..200 {
                let values = if i % 2 == 0 { &ones } else { &twos };
                shell.set_all(values).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                let snapshot = shell.get_all();
                assert!(snapshot.iter().all(|&v| v == snapshot[0]));
            }
        });
    });
}

#[test]
fn shell_is_a_tensor() {
    let a = Array::from_shape_fn([2, 3], |ix| (ix[0] * 3 + ix[1]) as f32)
        .with_ids(vec![vec!["a", "b"], vec!["x", "y", "z"]])
        .unwrap()
        .with_metadata("name", "grid");
    let shell = Shell::new(a, LockPolicy::PerRow);
    assert_eq!(shell.policy(), LockPolicy::PerRow);
    assert_eq!(shell.shape(), &[2, 3]);
    assert_eq!(shell.metadata()["name"], Value::from("grid"));
    assert_eq!(shell.get_by_key(&[Value::from("b"), Value::from("x")]).unwrap(), 3.);

    let column = shell.view().collapsed(1, 2).unwrap();
    assert_eq!(column.get_all_cells(), vec![2., 5.]);

    let doubled = Broadcast::new(Expr::arg(0) * 2.).and(&shell).apply().unwrap();
    assert_eq!(doubled.kind(), ElementKind::F32);
    assert_eq!(doubled.get_value(&[1, 2]).unwrap(), Value::F32(10.));
}

#[test]
fn errors_leave_shell_usable() {
    for policy in POLICIES {
        let shell = Shell::new(Array::<i8>::zeros([2, 2]), policy);
        assert_eq!(shell.get(&[0, 2]).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(shell.update(&[5, 0], |c| *c = 1).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(shell.set(&[0, 0, 0], 1).unwrap_err().kind(), ErrorKind::RankMismatch);
        assert_eq!(shell.set_all(&[1, 2, 3]).unwrap_err().kind(), ErrorKind::ShapeMismatch);
        thread::scope(|s| {
            s.spawn(|| shell.set(&[1, 1], 7).unwrap());
        });
        assert_eq!(shell.get_all(), vec![0, 0, 0, 7]);
    }
}
