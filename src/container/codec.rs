// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Binary encoding of entry payloads. All integers are big-endian.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{corrupt, Result, TensorError};
use crate::{Element, ElementKind, KindTag, Metadata, Value};

// Tag bytes of the tagged value encoding.
const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_CHAR: u8 = 2;
const TAG_I8: u8 = 3;
const TAG_I16: u8 = 4;
const TAG_I32: u8 = 5;
const TAG_I64: u8 = 6;
const TAG_F32: u8 = 7;
const TAG_F64: u8 = 8;
const TAG_STR: u8 = 9;
const TAG_LIST: u8 = 10;
const TAG_MAP: u8 = 11;

/// Lists and maps nested deeper than this are refused on read.
const MAX_DEPTH: usize = 128;

/// A bounds checked reader over one entry payload.
pub(crate) struct Decoder {
    buf: Bytes,
}

macro_rules! get_fixed {
    ($($name:ident: $t:ty => $get:ident),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$t> {
                self.need(std::mem::size_of::<$t>(), stringify!($t))?;
                Ok(self.buf.$get())
            }
        )*
    };
}

impl Decoder {
    pub fn new(buf: Bytes) -> Self {
        Decoder { buf }
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(corrupt(format!(
                "truncated {}: need {} bytes, {} left",
                what,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    get_fixed! {
        u8: u8 => get_u8,
        u16: u16 => get_u16,
        u32: u32 => get_u32,
        u64: u64 => get_u64,
        i8: i8 => get_i8,
        i16: i16 => get_i16,
        i32: i32 => get_i32,
        i64: i64 => get_i64,
        f32: f32 => get_f32,
        f64: f64 => get_f64,
    }

    /// A `u32` count or length.
    pub fn count(&mut self) -> Result<usize> {
        Ok(self.u32()? as usize)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn bytes(&mut self, n: usize) -> Result<Bytes> {
        self.need(n, "bytes")?;
        Ok(self.buf.split_to(n))
    }

    pub fn string(&mut self) -> Result<String> {
        let n = self.count()?;
        let raw = self.bytes(n)?;
        String::from_utf8(raw.to_vec()).map_err(|e| corrupt(format!("invalid UTF-8 string: {}", e)))
    }

    pub fn char(&mut self) -> Result<char> {
        let c = self.u32()?;
        char::from_u32(c).ok_or_else(|| corrupt(format!("invalid char code point {:#x}", c)))
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(corrupt(format!("invalid bool byte {}", b))),
        }
    }

    /// Fail unless the whole payload has been consumed.
    pub fn finish(self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(corrupt(format!("{} trailing bytes", self.buf.remaining())));
        }
        Ok(())
    }
}

pub(crate) fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    put_len(buf, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Write a `u32` count or length.
///
/// ***Errors*** with `UnsupportedValueType` if `n` does not fit.
pub(crate) fn put_len(buf: &mut BytesMut, n: usize) -> Result<()> {
    let n = u32::try_from(n)
        .map_err(|_| TensorError::UnsupportedValueType(format!("length {} exceeds the u32 range", n)))?;
    buf.put_u32(n);
    Ok(())
}

/// Write a self-describing value.
///
/// ***Errors*** with `PortabilityRisk` for [`Value::Opaque`].
pub(crate) fn put_value(buf: &mut BytesMut, value: &Value) -> Result<()> {
    match value {
        Value::Null => buf.put_u8(TAG_NULL),
        Value::Bool(v) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(*v as u8);
        }
        Value::Char(v) => {
            buf.put_u8(TAG_CHAR);
            buf.put_u32(*v as u32);
        }
        Value::I8(v) => {
            buf.put_u8(TAG_I8);
            buf.put_i8(*v);
        }
        Value::I16(v) => {
            buf.put_u8(TAG_I16);
            buf.put_i16(*v);
        }
        Value::I32(v) => {
            buf.put_u8(TAG_I32);
            buf.put_i32(*v);
        }
        Value::I64(v) => {
            buf.put_u8(TAG_I64);
            buf.put_i64(*v);
        }
        Value::F32(v) => {
            buf.put_u8(TAG_F32);
            buf.put_f32(*v);
        }
        Value::F64(v) => {
            buf.put_u8(TAG_F64);
            buf.put_f64(*v);
        }
        Value::Str(s) => {
            buf.put_u8(TAG_STR);
            put_string(buf, s)?;
        }
        Value::List(items) => {
            buf.put_u8(TAG_LIST);
            put_len(buf, items.len())?;
            for item in items {
                put_value(buf, item)?;
            }
        }
        Value::Map(map) => {
            buf.put_u8(TAG_MAP);
            put_map(buf, map)?;
        }
        Value::Opaque(o) => return Err(TensorError::PortabilityRisk(o.type_name().to_string())),
    }
    Ok(())
}

pub(crate) fn get_value(dec: &mut Decoder) -> Result<Value> {
    get_nested(dec, 0)
}

fn get_nested(dec: &mut Decoder, depth: usize) -> Result<Value> {
    Ok(match dec.u8()? {
        TAG_NULL => Value::Null,
        TAG_BOOL => Value::Bool(dec.bool()?),
        TAG_CHAR => Value::Char(dec.char()?),
        TAG_I8 => Value::I8(dec.i8()?),
        TAG_I16 => Value::I16(dec.i16()?),
        TAG_I32 => Value::I32(dec.i32()?),
        TAG_I64 => Value::I64(dec.i64()?),
        TAG_F32 => Value::F32(dec.f32()?),
        TAG_F64 => Value::F64(dec.f64()?),
        TAG_STR => Value::Str(dec.string()?),
        TAG_LIST => {
            check_depth(depth)?;
            let n = dec.count()?;
            Value::List((0..n).map(|_| get_nested(dec, depth + 1)).collect::<Result<_>>()?)
        }
        TAG_MAP => {
            check_depth(depth)?;
            Value::Map(get_entries(dec, depth + 1)?)
        }
        tag => return Err(corrupt(format!("unknown value tag {}", tag))),
    })
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(corrupt("value nesting too deep"));
    }
    Ok(())
}

fn put_map(buf: &mut BytesMut, map: &BTreeMap<String, Value>) -> Result<()> {
    put_len(buf, map.len())?;
    for (k, v) in map {
        put_string(buf, k)?;
        put_value(buf, v)?;
    }
    Ok(())
}

fn get_entries(dec: &mut Decoder, depth: usize) -> Result<BTreeMap<String, Value>> {
    let n = dec.count()?;
    (0..n)
        .map(|_| Ok((dec.string()?, get_nested(dec, depth)?)))
        .collect()
}

/// Write a metadata block: count, then key and tagged value pairs.
pub(crate) fn put_metadata(buf: &mut BytesMut, metadata: &Metadata) -> Result<()> {
    put_map(buf, metadata)
}

pub(crate) fn get_metadata(dec: &mut Decoder) -> Result<Metadata> {
    get_entries(dec, 0)
}

/// Fixed width encoding of one cell of a primitive kind; `Value` cells use
/// the tagged encoding.
pub(crate) trait CellCodec: Element {
    fn put(&self, buf: &mut BytesMut) -> Result<()>;
    fn get(dec: &mut Decoder) -> Result<Self>;
}

macro_rules! impl_cell_codec {
    ($($t:ty => $put:ident, $get:ident;)*) => {
        $(
            impl CellCodec for $t {
                #[inline]
                fn put(&self, buf: &mut BytesMut) -> Result<()> {
                    buf.$put(*self);
                    Ok(())
                }

                #[inline]
                fn get(dec: &mut Decoder) -> Result<Self> {
                    dec.$get()
                }
            }
        )*
    };
}

impl_cell_codec! {
    i8 => put_i8, i8;
    i16 => put_i16, i16;
    i32 => put_i32, i32;
    i64 => put_i64, i64;
    f32 => put_f32, f32;
    f64 => put_f64, f64;
}

impl CellCodec for bool {
    fn put(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(*self as u8);
        Ok(())
    }

    fn get(dec: &mut Decoder) -> Result<Self> {
        dec.bool()
    }
}

impl CellCodec for char {
    fn put(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u32(*self as u32);
        Ok(())
    }

    fn get(dec: &mut Decoder) -> Result<Self> {
        dec.char()
    }
}

impl CellCodec for Value {
    fn put(&self, buf: &mut BytesMut) -> Result<()> {
        put_value(buf, self)
    }

    fn get(dec: &mut Decoder) -> Result<Self> {
        get_value(dec)
    }
}

/// Evaluate `$body` with `$t` bound to the element type of `$kind`.
macro_rules! with_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::ElementKind::Bool => {
                type $t = bool;
                $body
            }
            $crate::ElementKind::Char => {
                type $t = char;
                $body
            }
            $crate::ElementKind::I8 => {
                type $t = i8;
                $body
            }
            $crate::ElementKind::I16 => {
                type $t = i16;
                $body
            }
            $crate::ElementKind::I32 => {
                type $t = i32;
                $body
            }
            $crate::ElementKind::I64 => {
                type $t = i64;
                $body
            }
            $crate::ElementKind::F32 => {
                type $t = f32;
                $body
            }
            $crate::ElementKind::F64 => {
                type $t = f64;
                $body
            }
            $crate::ElementKind::Ref => {
                type $t = Value;
                $body
            }
        }
    };
}

pub(crate) use with_kind;

/// The tag a sequence of values is stored under: the common primitive kind
/// if every value has the same one, `STRING` if every value is a string,
/// otherwise `OBJECT`.
pub(crate) fn values_tag(values: &[Value]) -> KindTag {
    if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Str(_))) {
        return KindTag::Text;
    }
    let first = values.first().and_then(Value::kind);
    match first {
        Some(kind) if values.iter().all(|v| v.kind() == Some(kind)) => KindTag::Kind(kind),
        _ => KindTag::Kind(ElementKind::Ref),
    }
}

/// Write `values` in the encoding of `tag`, as chosen by [`values_tag`].
pub(crate) fn put_values(buf: &mut BytesMut, tag: KindTag, values: &[Value]) -> Result<()> {
    match tag {
        KindTag::Text => {
            values
                .iter()
                .try_for_each(|v| put_string(buf, v.as_str().unwrap_or_default()))
        }
        KindTag::Kind(kind) => with_kind!(kind, T => {
            values
                .iter()
                .try_for_each(|v| <T as Element>::from_value(v)?.put(buf))
        }),
    }
}

/// Read `n` values stored in the encoding of `tag`.
pub(crate) fn get_values(dec: &mut Decoder, tag: KindTag, n: usize) -> Result<Vec<Value>> {
    match tag {
        KindTag::Text => (0..n).map(|_| dec.string().map(Value::Str)).collect(),
        KindTag::Kind(kind) => with_kind!(kind, T => {
            (0..n).map(|_| <T as CellCodec>::get(dec).map(|x| x.to_value())).collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Opaque};

    fn roundtrip(v: &Value) -> Value {
        let mut buf = BytesMut::new();
        put_value(&mut buf, v).unwrap();
        let mut dec = Decoder::new(buf.freeze());
        let back = get_value(&mut dec).unwrap();
        dec.finish().unwrap();
        back
    }

    #[test]
    fn nested_values() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::List(vec![Value::Null, 'é'.into(), (-1.5f32).into()]));
        let v = Value::Map(map);
        assert_eq!(roundtrip(&v), v);
        assert_eq!(roundtrip(&Value::I64(i64::MIN)), Value::I64(i64::MIN));
    }

    #[test]
    fn opaque_is_refused() {
        let mut buf = BytesMut::new();
        let v = Value::List(vec![Value::Opaque(Opaque::new(vec![1u8]))]);
        let err = put_value(&mut buf, &v).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PortabilityRisk);
    }

    #[test]
    fn truncated_and_trailing() {
        let mut dec = Decoder::new(Bytes::from_static(&[0, 0, 0, 9, b'a']));
        assert_eq!(dec.string().unwrap_err().kind(), ErrorKind::CorruptContainer);
        let mut dec = Decoder::new(Bytes::from_static(&[TAG_BOOL, 2]));
        assert_eq!(get_value(&mut dec).unwrap_err().kind(), ErrorKind::CorruptContainer);
        let dec = Decoder::new(Bytes::from_static(&[1]));
        assert_eq!(dec.finish().unwrap_err().kind(), ErrorKind::CorruptContainer);
    }

    #[test]
    fn deep_nesting() {
        let mut v = Value::Null;
        for _ in 0..MAX_DEPTH {
            v = Value::List(vec![v]);
        }
        assert_eq!(roundtrip(&v), v);

        // one list per five bytes, each holding the next
        let mut raw = Vec::new();
        for _ in 0..100_000 {
            raw.extend_from_slice(&[TAG_LIST, 0, 0, 0, 1]);
        }
        raw.push(TAG_NULL);
        let mut dec = Decoder::new(Bytes::from(raw));
        let err = get_value(&mut dec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptContainer);
        assert!(err.to_string().contains("too deep"));

        let mut raw = Vec::new();
        for _ in 0..=MAX_DEPTH {
            raw.extend_from_slice(&[TAG_MAP, 0, 0, 0, 1, 0, 0, 0, 1, b'k']);
        }
        raw.push(TAG_NULL);
        let mut dec = Decoder::new(Bytes::from(raw));
        assert_eq!(get_value(&mut dec).unwrap_err().kind(), ErrorKind::CorruptContainer);
    }

    #[test]
    fn key_tags() {
        let s = vec![Value::from("a"), Value::from("b")];
        assert_eq!(values_tag(&s), KindTag::Text);
        let i = vec![Value::I16(1), Value::I16(4)];
        assert_eq!(values_tag(&i), KindTag::Kind(ElementKind::I16));
        let mixed = vec![Value::I16(1), Value::I32(4)];
        assert_eq!(values_tag(&mixed), KindTag::Kind(ElementKind::Ref));
        assert_eq!(values_tag(&[]), KindTag::Kind(ElementKind::Ref));

        for (tag, values) in [(KindTag::Text, &s), (KindTag::Kind(ElementKind::I16), &i)] {
            let mut buf = BytesMut::new();
            put_values(&mut buf, tag, values).unwrap();
            let mut dec = Decoder::new(buf.freeze());
            assert_eq!(&get_values(&mut dec, tag, 2).unwrap(), values);
        }
    }
}
