// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The zip tensor container: several tensors, indices and groups sharing
//! one shape, packed into a single random-access binary file.
//!
//! # Layout
//!
//! The archive starts with the magic number [`MAGIC`] and the version byte
//! [`VERSION`], followed by the entry payloads back to back. After the
//! payloads comes the directory: a `u32` entry count, then per entry a `u16`
//! name length, the UTF-8 name, a `u64` offset and a `u64` length. The file
//! ends with the `u64` offset of the directory and the magic number again.
//! All integers are big-endian.
//!
//! Entries are named
//!
//! - `_dim`: the shared shape as ASCII, space separated sizes;
//! - `_tensor_<n>`: metadata, element kind tag, index entry number (or -1
//!   for the identity index) and the cells in column major order;
//! - `_index_<n>`: metadata, the coordinate tables (or -1 for the identity
//!   index) and optional per-dimension id keys;
//! - `_tensor_group_<n>`: metadata and named references to tensor and index
//!   entries.
//!
//! Entry numbers start at 0 and may have gaps after
//! [`remove_tensor`](ZipTensorWriter::remove_tensor).
//!
//! Metadata and [`Value`](crate::Value) cells use a self-describing tagged
//! encoding. [`Value::Opaque`](crate::Value::Opaque) has no portable
//! encoding and is refused with `PortabilityRisk`.
//!
//! ```
//! use std::io::Cursor;
//! use ndtensor::container::{ZipTensorReader, ZipTensorWriter};
//! use ndtensor::{Array, Value};
//!
//! let a = Array::from_shape_fn([2, 3], |ix| (ix[0] * 3 + ix[1]) as i16)
//!     .with_metadata("unit", "m");
//! let mut writer = ZipTensorWriter::new(Cursor::new(Vec::new()));
//! writer.add_tensor(&a).unwrap();
//! let bytes = writer.finish().unwrap().into_inner();
//!
//! let mut reader = ZipTensorReader::new(Cursor::new(bytes)).unwrap();
//! assert_eq!(reader.shape(), Some(&[2, 3][..]));
//! let back = reader.read_tensor(0).unwrap();
//! assert_eq!(back.as_array::<i16>(), Some(&a));
//! assert_eq!(back.metadata()["unit"], Value::from("m"));
//! ```

mod archive;
mod codec;
mod reader;
mod writer;

pub use self::reader::ZipTensorReader;
pub use self::writer::{ContainerState, ZipTensorWriter};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::Result;
use crate::index::{Ids, Index, MappedIndex};
use crate::{AnyArray, Metadata};

/// Magic number at the start and end of every container.
pub const MAGIC: &[u8; 4] = b"NDTZ";

/// Format version written by this crate.
pub const VERSION: u8 = 1;

const DIM_ENTRY: &str = "_dim";
const GROUP_PREFIX: &str = "_tensor_group_";
const TENSOR_PREFIX: &str = "_tensor_";
const INDEX_PREFIX: &str = "_index_";

/// A parsed entry name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EntryName {
    Dim,
    Tensor(u32),
    Index(u32),
    Group(u32),
}

impl EntryName {
    pub fn parse(name: &str) -> Option<EntryName> {
        if name == DIM_ENTRY {
            return Some(EntryName::Dim);
        }
        // groups share the tensor prefix
        if let Some(n) = name.strip_prefix(GROUP_PREFIX) {
            return n.parse().ok().map(EntryName::Group);
        }
        if let Some(n) = name.strip_prefix(TENSOR_PREFIX) {
            return n.parse().ok().map(EntryName::Tensor);
        }
        name.strip_prefix(INDEX_PREFIX)?.parse().ok().map(EntryName::Index)
    }

    pub fn to_name(self) -> String {
        match self {
            EntryName::Dim => DIM_ENTRY.to_string(),
            EntryName::Tensor(n) => format!("{}{}", TENSOR_PREFIX, n),
            EntryName::Index(n) => format!("{}{}", INDEX_PREFIX, n),
            EntryName::Group(n) => format!("{}{}", GROUP_PREFIX, n),
        }
    }
}

/// Named references to tensor and index entries of one container.
///
/// A group bundles related entries without copying their data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TensorGroup {
    pub metadata: Metadata,
    /// Name to tensor entry number.
    pub tensors: BTreeMap<String, u32>,
    /// Name to index entry number.
    pub indices: BTreeMap<String, u32>,
}

impl TensorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tensor(mut self, name: impl Into<String>, number: u32) -> Self {
        self.tensors.insert(name.into(), number);
        self
    }

    pub fn with_index(mut self, name: impl Into<String>, number: u32) -> Self {
        self.indices.insert(name.into(), number);
        self
    }
}

/// An index entry as read back from a container.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    pub metadata: Metadata,
    /// The coordinate tables, or `None` for the identity index of the
    /// container shape.
    pub mapping: Option<MappedIndex>,
    pub ids: Option<Ids>,
}

impl IndexEntry {
    /// The logical shape of the index inside a container of
    /// `container_shape`.
    pub fn shape(&self, container_shape: &[usize]) -> Vec<usize> {
        match &self.mapping {
            Some(m) => m.shape().to_vec(),
            None => container_shape.to_vec(),
        }
    }

    /// The index as coordinate tables, expanding the identity index of
    /// `container_shape` if needed.
    pub fn to_index(&self, container_shape: &[usize]) -> MappedIndex {
        match &self.mapping {
            Some(m) => m.clone(),
            None => MappedIndex::new(container_shape.iter().map(|&n| (0..n).collect()).collect()),
        }
    }
}

/// Write `arrays` into a new container file at `path`.
///
/// ***Errors*** with `ShapeMismatch` unless all arrays have the same shape,
/// `PortabilityRisk` if a cell, key or metadata value is opaque, and `Io`
/// on file system errors.
pub fn write_tensors(path: impl AsRef<Path>, arrays: &[AnyArray]) -> Result<()> {
    let mut writer = ZipTensorWriter::new(BufWriter::new(File::create(path)?));
    for a in arrays {
        writer.add_any(a)?;
    }
    writer.finish()?;
    Ok(())
}

/// Read every tensor of the container file at `path`, in entry number
/// order.
pub fn read_tensors(path: impl AsRef<Path>) -> Result<Vec<AnyArray>> {
    let mut reader = ZipTensorReader::new(BufReader::new(File::open(path)?))?;
    reader.read_all_tensors()
}
