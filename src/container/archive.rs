// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The archive layer: named byte entries behind a trailing directory.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::codec::Decoder;
use super::{MAGIC, VERSION};
use crate::error::{corrupt, Result, TensorError};

/// Magic and version byte.
const HEADER_LEN: u64 = 5;
/// Directory offset and magic.
const TRAILER_LEN: u64 = 12;

/// Write `entries` as one archive.
///
/// ***Errors*** with `UnsupportedValueType` before anything is written if an
/// entry name or the entry count does not fit the directory.
pub(crate) fn write_archive<W: Write>(sink: &mut W, entries: &BTreeMap<String, Bytes>) -> Result<()> {
    let mut directory = BytesMut::new();
    let count = u32::try_from(entries.len())
        .map_err(|_| TensorError::UnsupportedValueType(format!("{} entries exceed the u32 range", entries.len())))?;
    directory.put_u32(count);
    let mut offset = HEADER_LEN;
    for (name, payload) in entries {
        let name_len = u16::try_from(name.len()).map_err(|_| {
            TensorError::UnsupportedValueType(format!("entry name of {} bytes exceeds the u16 range", name.len()))
        })?;
        directory.put_u16(name_len);
        directory.put_slice(name.as_bytes());
        directory.put_u64(offset);
        directory.put_u64(payload.len() as u64);
        offset += payload.len() as u64;
    }
    directory.put_u64(offset);
    directory.put_slice(MAGIC);

    let mut head = BytesMut::with_capacity(HEADER_LEN as usize);
    head.put_slice(MAGIC);
    head.put_u8(VERSION);
    sink.write_all(&head)?;
    for payload in entries.values() {
        sink.write_all(payload)?;
    }
    sink.write_all(&directory)?;
    sink.flush()?;
    Ok(())
}

/// Random access to the entries of an archive.
pub(crate) struct Archive<R> {
    source: R,
    entries: BTreeMap<String, (u64, u64)>,
}

impl<R: Read + Seek> Archive<R> {
    /// Read the header, trailer and directory of `source`.
    ///
    /// ***Errors*** with `CorruptContainer` if any of them is malformed.
    pub fn new(mut source: R) -> Result<Self> {
        let end = source.seek(SeekFrom::End(0))?;
        if end < HEADER_LEN + TRAILER_LEN {
            return Err(corrupt(format!("{} bytes is too short for an archive", end)));
        }

        let mut head = [0; HEADER_LEN as usize];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut head)?;
        if &head[..4] != MAGIC {
            return Err(corrupt("bad magic number"));
        }
        if head[4] != VERSION {
            return Err(corrupt(format!("unsupported version {}", head[4])));
        }

        let mut tail = [0; TRAILER_LEN as usize];
        source.seek(SeekFrom::Start(end - TRAILER_LEN))?;
        source.read_exact(&mut tail)?;
        let mut dec = Decoder::new(Bytes::copy_from_slice(&tail));
        let dir_offset = dec.u64()?;
        if &tail[8..] != MAGIC {
            return Err(corrupt("bad trailing magic number"));
        }
        let dir_end = end - TRAILER_LEN;
        if dir_offset < HEADER_LEN || dir_offset > dir_end {
            return Err(corrupt(format!("directory offset {} out of range", dir_offset)));
        }

        let mut raw = vec![0; (dir_end - dir_offset) as usize];
        source.seek(SeekFrom::Start(dir_offset))?;
        source.read_exact(&mut raw)?;
        let mut dec = Decoder::new(Bytes::from(raw));
        let count = dec.count()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let name_len = dec.u16()? as usize;
            let name = String::from_utf8(dec.bytes(name_len)?.to_vec())
                .map_err(|_| corrupt("entry name is not UTF-8"))?;
            let offset = dec.u64()?;
            let len = dec.u64()?;
            let in_bounds = offset >= HEADER_LEN
                && offset.checked_add(len).map_or(false, |e| e <= dir_offset);
            if !in_bounds {
                return Err(corrupt(format!("entry {} lies outside the payload area", name)));
            }
            if entries.insert(name.clone(), (offset, len)).is_some() {
                return Err(corrupt(format!("entry {} appears twice", name)));
            }
        }
        dec.finish()?;
        trace!(entries = entries.len(), "read archive directory");
        Ok(Archive { source, entries })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Read the payload of entry `name`.
    ///
    /// ***Errors*** with `UnknownEntry` if the archive has no such entry.
    pub fn read_entry(&mut self, name: &str) -> Result<Bytes> {
        let &(offset, len) = self
            .entries
            .get(name)
            .ok_or_else(|| TensorError::UnknownEntry(name.to_string()))?;
        let mut payload = vec![0; len as usize];
        self.source.seek(SeekFrom::Start(offset))?;
        self.source.read_exact(&mut payload)?;
        Ok(Bytes::from(payload))
    }
}
