// Copyright 2026 ndtensor developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::error::{Result, TensorError};

/// The element kind of an array's cells.
///
/// Numeric kinds are totally ordered for type promotion:
///
/// ```text
/// Bool, Char < I8 < I16 < I32 < I64 < F32 < F64
/// ```
///
/// `Ref` holds arbitrary [`Value`](crate::Value)s and takes no part in
/// numeric promotion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ref,
}

impl ElementKind {
    /// Every kind, in promotion order, `Ref` last.
    pub const ALL: [ElementKind; 9] = [
        ElementKind::Bool,
        ElementKind::Char,
        ElementKind::I8,
        ElementKind::I16,
        ElementKind::I32,
        ElementKind::I64,
        ElementKind::F32,
        ElementKind::F64,
        ElementKind::Ref,
    ];

    /// Position in the promotion lattice, `None` for `Ref`.
    ///
    /// `Bool` and `Char` share the lowest rank.
    pub fn promotion_rank(self) -> Option<u8> {
        match self {
            ElementKind::Bool | ElementKind::Char => Some(0),
            ElementKind::I8 => Some(1),
            ElementKind::I16 => Some(2),
            ElementKind::I32 => Some(3),
            ElementKind::I64 => Some(4),
            ElementKind::F32 => Some(5),
            ElementKind::F64 => Some(6),
            ElementKind::Ref => None,
        }
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        self.promotion_rank().is_some()
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ElementKind::F32 | ElementKind::F64)
    }

    /// The common kind of two numeric kinds.
    ///
    /// Mixing `Bool` with `Char` promotes to `I8`, the lowest kind able to
    /// hold both.
    ///
    /// ***Errors*** with `UnsupportedValueType` if either kind is `Ref`.
    pub fn promote(self, other: ElementKind) -> Result<ElementKind> {
        let (a, b) = match (self.promotion_rank(), other.promotion_rank()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(TensorError::UnsupportedValueType(format!(
                    "no numeric promotion between {} and {}",
                    self, other
                )))
            }
        };
        Ok(if self == other {
            self
        } else if a == 0 && b == 0 {
            ElementKind::I8
        } else if a >= b {
            self
        } else {
            other
        })
    }

    /// The common kind of a sequence of numeric kinds.
    pub fn common<I>(kinds: I) -> Result<Option<ElementKind>>
    where
        I: IntoIterator<Item = ElementKind>,
    {
        kinds
            .into_iter()
            .try_fold(None, |acc: Option<ElementKind>, k| match acc {
                None => k.promote(k).map(Some),
                Some(acc) => acc.promote(k).map(Some),
            })
    }

    /// The tag naming this kind inside a zip tensor container.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Bool => "BOOLEAN",
            ElementKind::Char => "CHAR",
            ElementKind::I8 => "BYTE",
            ElementKind::I16 => "SHORT",
            ElementKind::I32 => "INT",
            ElementKind::I64 => "LONG",
            ElementKind::F32 => "FLOAT",
            ElementKind::F64 => "DOUBLE",
            ElementKind::Ref => "OBJECT",
        }
    }

    /// Parse a container tag. `STRING` is not a kind of its own: it names a
    /// `Ref` array whose values are all strings, see [`KindTag`].
    pub fn from_tag(tag: &str) -> Option<ElementKind> {
        ElementKind::ALL.iter().copied().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A kind tag as written in a container entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KindTag {
    Kind(ElementKind),
    /// A reference-kind block whose values are all strings.
    Text,
}

impl KindTag {
    pub const TEXT: &'static str = "STRING";

    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::Kind(k) => k.tag(),
            KindTag::Text => KindTag::TEXT,
        }
    }

    pub fn parse(tag: &str) -> Option<KindTag> {
        if tag == KindTag::TEXT {
            Some(KindTag::Text)
        } else {
            ElementKind::from_tag(tag).map(KindTag::Kind)
        }
    }

    /// The element kind of arrays stored under this tag.
    pub fn kind(self) -> ElementKind {
        match self {
            KindTag::Kind(k) => k,
            KindTag::Text => ElementKind::Ref,
        }
    }
}
