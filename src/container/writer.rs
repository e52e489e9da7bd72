// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use itertools::Itertools;
use tracing::debug;

use super::archive::write_archive;
use super::codec::{put_len, put_metadata, put_string, put_values, values_tag, CellCodec};
use super::{EntryName, TensorGroup, ZipTensorReader};
use crate::dimension::Indices;
use crate::error::{shape_mismatch, Result, TensorError};
use crate::index::{IdentityIndex, Ids, Index};
use crate::{AnyArray, Array, Element, KindTag, Metadata, Order, Tensor, Value};

/// Where a [`ZipTensorWriter`] is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerState {
    /// No entry has been added; the shape is not known yet.
    Uninitialized,
    /// The shape every tensor and index must have.
    ShapeFixed(Vec<usize>),
    /// Written to the sink; no more entries are accepted.
    Flushed,
}

/// Builds a zip tensor container in memory and writes it to a sink on
/// [`flush`](ZipTensorWriter::flush).
///
/// The first tensor or index added fixes the container shape; every later
/// one must have the same shape.
///
/// ***Errors*** from the adding methods: `ShapeMismatch` for a shape other
/// than the container shape, `ContainerFlushed` once flushed and
/// `PortabilityRisk` for opaque values.
pub struct ZipTensorWriter<W: Write> {
    sink: W,
    state: ContainerState,
    entries: BTreeMap<String, Bytes>,
    next_tensor: u32,
    next_index: u32,
    next_group: u32,
}

impl ZipTensorWriter<BufWriter<File>> {
    /// Create (or truncate) the container file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ZipTensorWriter<W> {
    /// An empty container to be written to `sink`.
    pub fn new(sink: W) -> Self {
        ZipTensorWriter {
            sink,
            state: ContainerState::Uninitialized,
            entries: BTreeMap::new(),
            next_tensor: 0,
            next_index: 0,
            next_group: 0,
        }
    }

    /// Continue the container read by `reader`, writing the result to `sink`.
    ///
    /// Every entry of `reader` is loaded first, and new entries are numbered
    /// after the highest existing number of their kind. `sink` must not
    /// truncate the file `reader` reads from before this returns.
    pub fn reopen<R: Read + Seek>(mut reader: ZipTensorReader<R>, sink: W) -> Result<Self> {
        let mut writer = Self::new(sink);
        if let Some(shape) = reader.shape() {
            writer.state = ContainerState::ShapeFixed(shape.to_vec());
        }
        for name in reader.entry_names() {
            let payload = reader.read_raw(&name)?;
            let next = match EntryName::parse(&name) {
                Some(EntryName::Tensor(n)) => Some((&mut writer.next_tensor, n)),
                Some(EntryName::Index(n)) => Some((&mut writer.next_index, n)),
                Some(EntryName::Group(n)) => Some((&mut writer.next_group, n)),
                _ => None,
            };
            if let Some((next, n)) = next {
                *next = (*next).max(n + 1);
            }
            writer.entries.insert(name, payload);
        }
        debug!(
            entries = writer.entries.len(),
            next_tensor = writer.next_tensor,
            "reopened container"
        );
        Ok(writer)
    }

    pub fn state(&self) -> &ContainerState {
        &self.state
    }

    /// The container shape, once fixed.
    pub fn shape(&self) -> Option<&[usize]> {
        match &self.state {
            ContainerState::ShapeFixed(shape) => Some(shape),
            _ => None,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            ContainerState::Flushed => Err(TensorError::ContainerFlushed),
            _ => Ok(()),
        }
    }

    /// Check that an entry of `shape` may be added, without fixing anything.
    fn check_shape(&self, shape: &[usize]) -> Result<()> {
        match &self.state {
            ContainerState::Flushed => Err(TensorError::ContainerFlushed),
            ContainerState::ShapeFixed(fixed) if fixed.as_slice() != shape => {
                Err(shape_mismatch(fixed, shape))
            }
            _ => Ok(()),
        }
    }

    /// Fix the container shape, or check `shape` against it if already fixed.
    pub fn fix_shape(&mut self, shape: &[usize]) -> Result<()> {
        self.check_shape(shape)?;
        if self.state == ContainerState::Uninitialized {
            let text = shape.iter().join(" ");
            self.entries.insert(EntryName::Dim.to_name(), Bytes::from(text));
            self.state = ContainerState::ShapeFixed(shape.to_vec());
            debug!(?shape, "fixed container shape");
        }
        Ok(())
    }

    /// Add a snapshot of the cells, metadata and ids of `tensor`, returning
    /// its tensor number.
    ///
    /// Views and shells are stored as plain tensors. If `tensor` has ids, an
    /// index entry holding them is added and referenced.
    pub fn add_tensor<T: Tensor>(&mut self, tensor: &T) -> Result<u32> {
        self.add_any(&snapshot(tensor))
    }

    /// Like [`add_tensor`](Self::add_tensor) for a dynamically typed array.
    ///
    /// Nothing is added and the state is unchanged if any part fails.
    pub fn add_any(&mut self, array: &AnyArray) -> Result<u32> {
        self.check_shape(array.shape())?;
        let index = match array.ids() {
            Some(ids) => {
                let identity = IdentityIndex::new(array.shape());
                Some(encode_index(&identity, Some(ids), &Metadata::new())?)
            }
            None => None,
        };
        let tensor = encode_tensor(array, index.as_ref().map(|_| self.next_index))?;

        self.fix_shape(array.shape())?;
        if let Some(payload) = index {
            self.push_index(payload);
        }
        Ok(self.push_tensor(tensor))
    }

    /// Add `tensor` referencing the existing index entry `index`.
    ///
    /// Ids come from the index entry; ids carried by `tensor` are not
    /// written.
    ///
    /// ***Errors*** with `UnknownEntry` if there is no index entry `index`.
    pub fn add_tensor_with_index<T: Tensor>(&mut self, tensor: &T, index: u32) -> Result<u32> {
        self.ensure_open()?;
        self.require(EntryName::Index(index))?;
        let array = snapshot(tensor);
        self.check_shape(array.shape())?;
        let payload = encode_tensor(&array, Some(index))?;
        self.fix_shape(array.shape())?;
        Ok(self.push_tensor(payload))
    }

    fn require(&self, entry: EntryName) -> Result<()> {
        let name = entry.to_name();
        if !self.entries.contains_key(&name) {
            return Err(TensorError::UnknownEntry(name));
        }
        Ok(())
    }

    fn push_tensor(&mut self, payload: BytesMut) -> u32 {
        let n = self.next_tensor;
        self.next_tensor += 1;
        self.insert(EntryName::Tensor(n), payload);
        n
    }

    fn push_index(&mut self, payload: BytesMut) -> u32 {
        let n = self.next_index;
        self.next_index += 1;
        self.insert(EntryName::Index(n), payload);
        n
    }

    /// Add an index entry, returning its index number.
    ///
    /// An identity index is stored without tables. `ids`, if given, must
    /// have the logical shape of `index`.
    pub fn add_index<I: Index + ?Sized>(
        &mut self,
        index: &I,
        ids: Option<&Ids>,
        metadata: &Metadata,
    ) -> Result<u32> {
        self.check_shape(index.shape())?;
        let payload = encode_index(index, ids, metadata)?;
        self.fix_shape(index.shape())?;
        Ok(self.push_index(payload))
    }

    /// Add a group, returning its group number.
    ///
    /// ***Errors*** with `UnknownEntry` if the group references a tensor or
    /// index entry that does not exist.
    pub fn add_group(&mut self, group: &TensorGroup) -> Result<u32> {
        self.ensure_open()?;
        for &n in group.tensors.values() {
            self.require(EntryName::Tensor(n))?;
        }
        for &n in group.indices.values() {
            self.require(EntryName::Index(n))?;
        }

        let mut buf = BytesMut::new();
        put_metadata(&mut buf, &group.metadata)?;
        for refs in [&group.tensors, &group.indices] {
            put_len(&mut buf, refs.len())?;
            for (name, &n) in refs {
                put_string(&mut buf, name)?;
                put_entry_number(&mut buf, Some(n))?;
            }
        }

        let n = self.next_group;
        self.next_group += 1;
        self.insert(EntryName::Group(n), buf);
        Ok(n)
    }

    /// Remove tensor entry `n`. Its number is not reused.
    pub fn remove_tensor(&mut self, n: u32) -> Result<()> {
        self.ensure_open()?;
        let name = EntryName::Tensor(n).to_name();
        self.entries
            .remove(&name)
            .map(drop)
            .ok_or(TensorError::UnknownEntry(name))
    }

    fn insert(&mut self, entry: EntryName, payload: BytesMut) {
        let name = entry.to_name();
        debug!(entry = %name, bytes = payload.len(), "added container entry");
        self.entries.insert(name, payload.freeze());
    }

    /// Write the container to the sink.
    ///
    /// ***Errors*** with `ContainerFlushed` if already flushed, and `Io` if
    /// the sink fails.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        write_archive(&mut self.sink, &self.entries)?;
        self.state = ContainerState::Flushed;
        debug!(entries = self.entries.len(), "flushed container");
        Ok(())
    }

    /// Flush unless already flushed, and return the sink.
    pub fn finish(mut self) -> Result<W> {
        if self.state != ContainerState::Flushed {
            self.flush()?;
        }
        Ok(self.sink)
    }
}

fn snapshot<T: Tensor>(tensor: &T) -> AnyArray {
    Array::from_raw_parts(
        tensor.get_all_cells(),
        tensor.shape(),
        tensor.metadata().clone(),
        tensor.ids().cloned(),
    )
    .into_any()
}

/// `STRING` for reference arrays holding only strings, else the kind's tag.
fn tensor_tag(array: &AnyArray) -> KindTag {
    match array {
        AnyArray::Ref(a) => match values_tag(a.as_slice()) {
            KindTag::Text => KindTag::Text,
            _ => KindTag::Kind(array.kind()),
        },
        _ => KindTag::Kind(array.kind()),
    }
}

fn encode_tensor(array: &AnyArray, index: Option<u32>) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    put_metadata(&mut buf, array.metadata())?;
    let tag = tensor_tag(array);
    put_string(&mut buf, tag.as_str())?;
    put_entry_number(&mut buf, index)?;
    match array {
        AnyArray::Bool(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::Char(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::I8(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::I16(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::I32(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::I64(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::F32(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::F64(a) => put_cells(&mut buf, a, CellCodec::put)?,
        AnyArray::Ref(a) if tag == KindTag::Text => put_cells(&mut buf, a, |v: &Value, buf| {
            put_string(buf, v.as_str().unwrap_or_default())
        })?,
        AnyArray::Ref(a) => put_cells(&mut buf, a, CellCodec::put)?,
    }
    Ok(buf)
}

fn encode_index<I: Index + ?Sized>(index: &I, ids: Option<&Ids>, metadata: &Metadata) -> Result<BytesMut> {
    if let Some(ids) = ids {
        let ids_shape = ids.shape();
        if ids_shape != index.shape() {
            return Err(shape_mismatch(index.shape(), &ids_shape));
        }
    }

    let mut buf = BytesMut::new();
    put_metadata(&mut buf, metadata)?;
    if index.is_identity() {
        buf.put_i32(-1);
    } else {
        let rank = i32::try_from(index.ndim())
            .map_err(|_| TensorError::UnsupportedValueType(format!("rank {} exceeds the i32 range", index.ndim())))?;
        buf.put_i32(rank);
        for &len in index.shape() {
            put_len(&mut buf, len)?;
        }
        for dim in 0..index.ndim() {
            for physical in index.table(dim)? {
                put_len(&mut buf, physical)?;
            }
        }
    }
    buf.put_u8(ids.is_some() as u8);
    if let Some(ids) = ids {
        for dim in 0..ids.ndim() {
            let keys = ids.keys(dim);
            let tag = values_tag(keys);
            put_string(&mut buf, tag.as_str())?;
            put_values(&mut buf, tag, keys)?;
        }
    }
    Ok(buf)
}

/// An entry reference, `-1` for none.
fn put_entry_number(buf: &mut BytesMut, n: Option<u32>) -> Result<()> {
    let n = match n {
        Some(n) => i32::try_from(n)
            .map_err(|_| TensorError::UnsupportedValueType(format!("entry number {} exceeds the i32 range", n)))?,
        None => -1,
    };
    buf.put_i32(n);
    Ok(())
}

/// Write every cell of `array` in column major order.
fn put_cells<A, F>(buf: &mut BytesMut, array: &Array<A>, mut put: F) -> Result<()>
where
    A: Element,
    F: FnMut(&A, &mut BytesMut) -> Result<()>,
{
    for ix in Indices::new(array.shape(), Order::ColumnMajor) {
        put(&array.get_cell(&ix)?, buf)?;
    }
    Ok(())
}

impl<W: Write> fmt::Debug for ZipTensorWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipTensorWriter")
            .field("state", &self.state)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
