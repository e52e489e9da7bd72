// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;

use thiserror::Error;

/// An error produced by any tensor operation.
///
/// Use [`.kind()`](TensorError::kind) to match on the category of the error
/// without caring about the details it carries.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Two shapes that must be identical are not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    /// The number of coordinates does not equal the array's rank.
    #[error("rank mismatch: expected {expected} coordinates, found {found}")]
    RankMismatch { expected: usize, found: usize },

    /// A coordinate is outside its dimension.
    #[error("index {index} out of range for dimension {dim} of length {len}")]
    IndexOutOfRange { dim: usize, index: usize, len: usize },

    /// A view transform cannot be represented.
    #[error("invalid view: {0}")]
    InvalidViewSpec(String),

    /// A dimension's id keys contain a repeat.
    #[error("duplicate key {key} in dimension {dim}")]
    DuplicateKey { dim: usize, key: String },

    /// A dimension's id key count differs from its size.
    #[error("dimension {dim} has {found} keys but length {expected}")]
    KeyCountMismatch { dim: usize, expected: usize, found: usize },

    /// A key lookup found no such key.
    #[error("key {key} not found in dimension {dim}")]
    KeyNotFound { dim: usize, key: String },

    /// Automatic dimension matching failed.
    #[error("cannot match shape {smaller:?} onto the leading dimensions of {larger:?}")]
    UnmatchableShape { smaller: Vec<usize>, larger: Vec<usize> },

    /// An explicit dimension mapping is malformed.
    #[error("invalid matching dimensions: {0}")]
    InvalidMatchingSpec(String),

    /// Integer division or remainder by zero during cell-wise evaluation.
    #[error("integer division by zero")]
    DivisionByZero,

    /// Container data is unreadable or inconsistent.
    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    /// A container entry that was referenced does not exist.
    #[error("no such container entry: {0}")]
    UnknownEntry(String),

    /// The container has been flushed and accepts no more entries.
    #[error("container already flushed")]
    ContainerFlushed,

    /// A value cannot be represented by the requested element kind.
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// A value would need opaque native serialization.
    #[error("value of type {0} has no portable encoding")]
    PortabilityRisk(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error code for a [`TensorError`].
///
/// This enumeration is not exhaustive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    ShapeMismatch,
    RankMismatch,
    IndexOutOfRange,
    InvalidViewSpec,
    DuplicateKey,
    KeyCountMismatch,
    KeyNotFound,
    UnmatchableShape,
    InvalidMatchingSpec,
    DivisionByZero,
    CorruptContainer,
    UnknownEntry,
    ContainerFlushed,
    UnsupportedValueType,
    PortabilityRisk,
    Io,
}

impl TensorError {
    /// Return the `ErrorKind` of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TensorError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            TensorError::RankMismatch { .. } => ErrorKind::RankMismatch,
            TensorError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            TensorError::InvalidViewSpec(_) => ErrorKind::InvalidViewSpec,
            TensorError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            TensorError::KeyCountMismatch { .. } => ErrorKind::KeyCountMismatch,
            TensorError::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            TensorError::UnmatchableShape { .. } => ErrorKind::UnmatchableShape,
            TensorError::InvalidMatchingSpec(_) => ErrorKind::InvalidMatchingSpec,
            TensorError::DivisionByZero => ErrorKind::DivisionByZero,
            TensorError::CorruptContainer(_) => ErrorKind::CorruptContainer,
            TensorError::UnknownEntry(_) => ErrorKind::UnknownEntry,
            TensorError::ContainerFlushed => ErrorKind::ContainerFlushed,
            TensorError::UnsupportedValueType(_) => ErrorKind::UnsupportedValueType,
            TensorError::PortabilityRisk(_) => ErrorKind::PortabilityRisk,
            TensorError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = TensorError> = std::result::Result<T, E>;

pub(crate) fn shape_mismatch(expected: &[usize], found: &[usize]) -> TensorError {
    TensorError::ShapeMismatch {
        expected: expected.to_vec(),
        found: found.to_vec(),
    }
}

pub(crate) fn corrupt(msg: impl Into<String>) -> TensorError {
    TensorError::CorruptContainer(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = TensorError::IndexOutOfRange { dim: 1, index: 7, len: 6 };
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(err.to_string(), "index 7 out of range for dimension 1 of length 6");

        let io = TensorError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert_eq!(io.kind(), ErrorKind::Io);
    }
}
