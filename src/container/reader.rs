// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use super::archive::Archive;
use super::codec::{get_metadata, get_values, with_kind, CellCodec, Decoder};
use super::{EntryName, IndexEntry, TensorGroup};
use crate::dimension::{size_of_shape_checked, Indices};
use crate::error::{corrupt, Result, TensorError};
use crate::index::{Ids, Index, MappedIndex};
use crate::{AnyArray, Array, Element, KindTag, Order, TensorMut, Value};

/// Reads tensors, indices and groups from a zip tensor container.
///
/// Entries are read on demand; only the directory and the shape are read
/// up front.
pub struct ZipTensorReader<R> {
    archive: Archive<R>,
    shape: Option<Vec<usize>>,
}

impl ZipTensorReader<BufReader<File>> {
    /// Open the container file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ZipTensorReader<R> {
    /// Read the directory and shape of the container in `source`.
    ///
    /// ***Errors*** with `CorruptContainer` if `source` is not a container
    /// or its shape entry is malformed.
    pub fn new(source: R) -> Result<Self> {
        let mut archive = Archive::new(source)?;
        let dim = EntryName::Dim.to_name();
        let shape = if archive.contains(&dim) {
            let text = archive.read_entry(&dim)?;
            Some(parse_shape(&text)?)
        } else {
            None
        };
        debug!(?shape, "opened container");
        Ok(ZipTensorReader { archive, shape })
    }

    /// The container shape, or `None` for a container without entries.
    pub fn shape(&self) -> Option<&[usize]> {
        self.shape.as_deref()
    }

    fn numbers(&self, pick: fn(EntryName) -> Option<u32>) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .archive
            .names()
            .filter_map(EntryName::parse)
            .filter_map(pick)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// The numbers of all tensor entries, ascending.
    pub fn tensor_numbers(&self) -> Vec<u32> {
        self.numbers(|e| match e {
            EntryName::Tensor(n) => Some(n),
            _ => None,
        })
    }

    pub fn index_numbers(&self) -> Vec<u32> {
        self.numbers(|e| match e {
            EntryName::Index(n) => Some(n),
            _ => None,
        })
    }

    pub fn group_numbers(&self) -> Vec<u32> {
        self.numbers(|e| match e {
            EntryName::Group(n) => Some(n),
            _ => None,
        })
    }

    fn container_shape(&self) -> Result<Vec<usize>> {
        self.shape
            .clone()
            .ok_or_else(|| corrupt("entries present but no shape entry"))
    }

    /// Read tensor entry `n` as an owned array.
    ///
    /// Metadata is restored, and so are ids if the tensor references an
    /// index entry with ids. A tensor stored from a view reads back as a
    /// plain array.
    ///
    /// ***Errors*** with `UnknownEntry` if there is no tensor `n` and
    /// `CorruptContainer` if its entry cannot be decoded.
    pub fn read_tensor(&mut self, n: u32) -> Result<AnyArray> {
        let payload = self.archive.read_entry(&EntryName::Tensor(n).to_name())?;
        let shape = self.container_shape()?;
        let mut dec = Decoder::new(payload);
        let metadata = get_metadata(&mut dec)?;
        let tag = get_tag(&mut dec)?;
        let index = get_entry_number(&mut dec)?;
        let mut array = match tag {
            KindTag::Text => {
                AnyArray::Ref(get_cells(&mut dec, &shape, |d| d.string().map(Value::Str))?)
            }
            KindTag::Kind(kind) => with_kind!(kind, T => {
                get_cells(&mut dec, &shape, <T as CellCodec>::get)?.into_any()
            }),
        };
        dec.finish()?;
        *array.metadata_mut() = metadata;

        if let Some(index) = index {
            if let Some(ids) = self.read_index(index)?.ids {
                array
                    .set_ids_from(ids)
                    .map_err(|e| corrupt(format!("tensor {} ids: {}", n, e)))?;
            }
        }
        debug!(tensor = n, kind = %array.kind(), "read tensor");
        Ok(array)
    }

    /// Read index entry `n`.
    pub fn read_index(&mut self, n: u32) -> Result<IndexEntry> {
        let payload = self.archive.read_entry(&EntryName::Index(n).to_name())?;
        let mut dec = Decoder::new(payload);
        let metadata = get_metadata(&mut dec)?;
        let mapping = match dec.i32()? {
            -1 => None,
            rank if rank < 0 => return Err(corrupt(format!("index {} has rank {}", n, rank))),
            rank => {
                let sizes = (0..rank).map(|_| dec.count()).collect::<Result<Vec<_>>>()?;
                let tables = sizes
                    .iter()
                    .map(|&len| (0..len).map(|_| dec.count()).collect::<Result<Vec<_>>>())
                    .collect::<Result<Vec<_>>>()?;
                Some(MappedIndex::new(tables))
            }
        };
        let shape = match &mapping {
            Some(m) => m.shape().to_vec(),
            None => self.container_shape()?,
        };
        let ids = if dec.bool()? {
            let keys = shape
                .iter()
                .map(|&len| {
                    let tag = get_tag(&mut dec)?;
                    get_values(&mut dec, tag, len)
                })
                .collect::<Result<Vec<_>>>()?;
            let ids = Ids::new(keys, &shape).map_err(|e| corrupt(format!("index {} ids: {}", n, e)))?;
            Some(ids)
        } else {
            None
        };
        dec.finish()?;
        Ok(IndexEntry {
            metadata,
            mapping,
            ids,
        })
    }

    /// Read group entry `n`.
    pub fn read_group(&mut self, n: u32) -> Result<TensorGroup> {
        let payload = self.archive.read_entry(&EntryName::Group(n).to_name())?;
        let mut dec = Decoder::new(payload);
        let mut group = TensorGroup::new();
        group.metadata = get_metadata(&mut dec)?;
        for refs in [&mut group.tensors, &mut group.indices] {
            let count = dec.count()?;
            for _ in 0..count {
                let name = dec.string()?;
                let number = get_entry_number(&mut dec)?
                    .ok_or_else(|| corrupt(format!("group {} reference {} is -1", n, name)))?;
                refs.insert(name, number);
            }
        }
        dec.finish()?;
        Ok(group)
    }

    /// Read every tensor in entry number order.
    pub fn read_all_tensors(&mut self) -> Result<Vec<AnyArray>> {
        self.tensor_numbers()
            .into_iter()
            .map(|n| self.read_tensor(n))
            .collect()
    }

    pub(crate) fn entry_names(&self) -> Vec<String> {
        self.archive.names().map(String::from).collect()
    }

    pub(crate) fn read_raw(&mut self, name: &str) -> Result<Bytes> {
        self.archive.read_entry(name)
    }
}

fn parse_shape(text: &[u8]) -> Result<Vec<usize>> {
    let text = std::str::from_utf8(text).map_err(|_| corrupt("shape entry is not ASCII"))?;
    let shape = text
        .split_whitespace()
        .map(|s| {
            s.parse()
                .map_err(|_| corrupt(format!("bad dimension size {:?}", s)))
        })
        .collect::<Result<Vec<usize>>>()?;
    if size_of_shape_checked(&shape).is_none() {
        return Err(corrupt(format!("shape {:?} is too large", shape)));
    }
    Ok(shape)
}

fn get_tag(dec: &mut Decoder) -> Result<KindTag> {
    let tag = dec.string()?;
    KindTag::parse(&tag).ok_or_else(|| TensorError::UnsupportedValueType(tag))
}

fn get_entry_number(dec: &mut Decoder) -> Result<Option<u32>> {
    match dec.i32()? {
        -1 => Ok(None),
        n if n < 0 => Err(corrupt(format!("bad entry number {}", n))),
        n => Ok(Some(n as u32)),
    }
}

/// Read the cells of an array of `shape` stored in column major order.
fn get_cells<A, F>(dec: &mut Decoder, shape: &[usize], mut get: F) -> Result<Array<A>>
where
    A: Element,
    F: FnMut(&mut Decoder) -> Result<A>,
{
    // every cell takes at least one byte
    let len = size_of_shape_checked(shape).ok_or_else(|| corrupt(format!("shape {:?} is too large", shape)))?;
    if len > dec.remaining() {
        return Err(corrupt(format!("{} cells in {} bytes", len, dec.remaining())));
    }
    let mut array = Array::zeros(shape);
    for ix in Indices::new(shape, Order::ColumnMajor) {
        array.set_cell(&ix, get(dec)?)?;
    }
    Ok(array)
}

impl<R> fmt::Debug for ZipTensorReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipTensorReader")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::archive::write_archive;
    use crate::container::ZipTensorWriter;
    use std::collections::BTreeMap;
    use crate::{ElementKind, ErrorKind, Metadata, Tensor};
    use std::io::Cursor;

    fn reader(w: ZipTensorWriter<Cursor<Vec<u8>>>) -> ZipTensorReader<Cursor<Vec<u8>>> {
        let bytes = w.finish().unwrap().into_inner();
        ZipTensorReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn empty_container() {
        let mut r = reader(ZipTensorWriter::new(Cursor::new(Vec::new())));
        assert_eq!(r.shape(), None);
        assert!(r.tensor_numbers().is_empty());
        assert!(r.read_all_tensors().unwrap().is_empty());
        assert_eq!(r.read_tensor(0).unwrap_err().kind(), ErrorKind::UnknownEntry);
    }

    #[test]
    fn rank_zero_and_empty_shapes() {
        for shape in [vec![], vec![0, 4]] {
            let mut w = ZipTensorWriter::new(Cursor::new(Vec::new()));
            w.add_tensor(&Array::from_elem(&shape, 7i8)).unwrap();
            let mut r = reader(w);
            assert_eq!(r.shape(), Some(&shape[..]));
            let a = r.read_tensor(0).unwrap();
            assert_eq!(a.shape(), &shape[..]);
            assert_eq!(a.kind(), ElementKind::I8);
        }
    }

    #[test]
    fn strings_and_objects() {
        let text = Array::from_shape_vec([2], vec![Value::from("a"), Value::from("bc")]).unwrap();
        let mixed = Array::from_shape_vec([2], vec![Value::from("a"), Value::I64(3)]).unwrap();
        let mut w = ZipTensorWriter::new(Cursor::new(Vec::new()));
        w.add_tensor(&text).unwrap();
        w.add_tensor(&mixed).unwrap();
        let mut r = reader(w);
        let all = r.read_all_tensors().unwrap();
        assert_eq!(all[0].as_array::<Value>(), Some(&text));
        assert_eq!(all[1].as_array::<Value>(), Some(&mixed));
    }

    #[test]
    fn mapped_index_with_mixed_ids() {
        let mut w = ZipTensorWriter::new(Cursor::new(Vec::new()));
        let index = MappedIndex::new(vec![vec![1, 0], vec![2, 0, 1]]);
        let ids = Ids::new(
            vec![
                vec![Value::from("x"), Value::I32(2)],
                vec![Value::F64(0.5), Value::F64(1.5), Value::F64(2.5)],
            ],
            &[2, 3],
        )
        .unwrap();
        let mut meta = Metadata::new();
        meta.insert("role".into(), "transpose".into());
        let n = w.add_index(&index, Some(&ids), &meta).unwrap();
        let t = w
            .add_tensor_with_index(&Array::<f32>::zeros([2, 3]), n)
            .unwrap();

        let mut r = reader(w);
        assert_eq!(r.index_numbers(), vec![0]);
        let entry = r.read_index(n).unwrap();
        assert_eq!(entry.mapping.as_ref(), Some(&index));
        assert_eq!(entry.ids.as_ref(), Some(&ids));
        assert_eq!(entry.metadata, meta);
        let a = r.read_tensor(t).unwrap();
        assert_eq!(a.ids(), Some(&ids));
    }

    #[test]
    fn corrupt_shape_entry() {
        assert_eq!(parse_shape(b"2 3").unwrap(), vec![2, 3]);
        assert_eq!(parse_shape(b"").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_shape(b"2 x").unwrap_err().kind(), ErrorKind::CorruptContainer);
        let err = parse_shape(b"4294967296 4294967296 4294967296").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptContainer);
        assert_eq!(parse_shape(b"0 9").unwrap(), vec![0, 9]);
    }

    #[test]
    fn cell_count_is_bounded_by_payload() {
        let mut w = ZipTensorWriter::new(Cursor::new(Vec::new()));
        w.add_tensor(&Array::<i8>::zeros([2])).unwrap();
        let mut entries = BTreeMap::new();
        entries.insert("_tensor_0".to_string(), reader(w).read_raw("_tensor_0").unwrap());
        entries.insert("_dim".to_string(), Bytes::from_static(b"100000 100000"));
        let mut bytes = Vec::new();
        write_archive(&mut bytes, &entries).unwrap();
        let mut r = ZipTensorReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.shape(), Some(&[100000, 100000][..]));
        assert_eq!(r.read_tensor(0).unwrap_err().kind(), ErrorKind::CorruptContainer);

        let mut dec = Decoder::new(Bytes::from_static(&[1, 2, 3]));
        let err = get_cells(&mut dec, &[2, 2], |d| d.i8()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptContainer);
        let mut dec = Decoder::new(Bytes::from_static(&[1, 2, 3, 4]));
        let a = get_cells(&mut dec, &[2, 2], |d| d.i8()).unwrap();
        assert_eq!(a.get_cell(&[0, 1]).unwrap(), 3);
    }

    #[test]
    fn view_reads_back_as_array() {
        let a = Array::from_shape_fn([2, 3], |ix| (ix[0] * 10 + ix[1]) as i64);
        let v = a.view().permuted(&[1, 0]).unwrap();
        let mut w = ZipTensorWriter::new(Cursor::new(Vec::new()));
        w.add_tensor(&v).unwrap();
        let back = reader(w).read_tensor(0).unwrap();
        assert_eq!(back.shape(), &[3, 2]);
        assert_eq!(back.get_value(&[2, 1]).unwrap(), Value::I64(12));
        assert_eq!(v.get_cell(&[2, 1]).unwrap(), 12);
    }
}
