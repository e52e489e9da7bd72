// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use ndtensor::{Array, Tensor};

#[test]
fn serial_many_dim_serde() {
    {
        let a = Array::scalar(2.72f32);
        let serial = serde_json::to_string(&a).unwrap();
        println!("Serde encode {:?} => {:?}", a, serial);
        let res = serde_json::from_str::<Array<f32>>(&serial);
        println!("{:?}", res);
        assert_eq!(a, res.unwrap());
    }

    {
        let a = Array::from_shape_vec([3], vec![2.72f32, 1., 2.]).unwrap();
        let serial = serde_json::to_string(&a).unwrap();
        println!("Serde encode {:?} => {:?}", a, serial);
        let res = serde_json::from_str::<Array<f32>>(&serial);
        println!("{:?}", res);
        assert_eq!(a, res.unwrap());
    }

    {
        let a = Array::from_shape_vec([2, 3], vec![3f32, 1., 2.2, 3.1, 4., 7.]).unwrap();
        let serial = serde_json::to_string(&a).unwrap();
        println!("Serde encode {:?} => {:?}", a, serial);
        let res = serde_json::from_str::<Array<f32>>(&serial);
        println!("{:?}", res);
        assert_eq!(a, res.unwrap());
        let text = r##"{"v":1,"dim":[2,3],"data":[3,1,2.2,3.1,4,7]}"##;
        let b = serde_json::from_str::<Array<f32>>(text);
        assert_eq!(a, b.unwrap());
    }

    {
        // A view serializes through an owned copy.
        let a = Array::from_shape_fn([2, 2, 2, 4], |ix| (ix[0] * 16 + ix[1] * 8 + ix[2] * 4 + ix[3]) as i64);
        let v = a.view().sliced(3, 0..2).unwrap().to_owned();
        let serial = serde_json::to_string(&v).unwrap();
        let res = serde_json::from_str::<Array<i64>>(&serial).unwrap();
        assert_eq!(res.shape(), &[2, 2, 2, 2]);
        assert_eq!(v, res);
    }
}

#[test]
fn serial_wrong_count_serde() {
    // one element too few
    let text = r##"{"v":1,"dim":[2,3],"data":[3,1,2.2,3.1,4]}"##;
    let arr = serde_json::from_str::<Array<f32>>(text);
    println!("{:?}", arr);
    assert!(arr.is_err());

    // one element too many
    let text = r##"{"v":1,"dim":[2,3],"data":[3,1,2.2,3.1,4,7,6]}"##;
    let arr = serde_json::from_str::<Array<f32>>(text);
    println!("{:?}", arr);
    assert!(arr.is_err());
}

#[test]
fn serial_wrong_version_serde() {
    let text = r##"{"v":2,"dim":[1],"data":[3]}"##;
    assert!(serde_json::from_str::<Array<f32>>(text).is_err());
}

#[test]
fn serial_many_dim_serde_msgpack() {
    let a = Array::from_shape_fn([2, 2, 3], |ix| ix[0] as i16 - ix[2] as i16);
    let buf = rmp_serde::to_vec(&a).unwrap();
    let a_de: Array<i16> = rmp_serde::from_slice(&buf).unwrap();
    assert_eq!(a, a_de);
}

#[test]
fn serial_many_dim_ron() {
    let a = Array::from_shape_fn([2, 3], |ix| ix[0] == ix[1]);
    let a_s = ron::ser::to_string(&a).unwrap();
    let a_de: Array<bool> = ron::de::from_str(&a_s).unwrap();
    assert_eq!(a, a_de);
}
