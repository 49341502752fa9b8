// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Byte representation
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// BLUE files tag both the header and the data with a four character byte
// order marker: `IEEE` for big-endian and `EEEI` for little-endian. The
// helpers here read and write fixed-width numbers at absolute offsets in the
// order selected by such a tag.

use std::fmt;

use crate::error::{BlueError, BlueResult};

/// Byte order of a BLUE header or data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Big-endian (`IEEE`).
    Ieee,
    /// Little-endian (`EEEI`).
    Eeei,
}

impl ByteOrder {
    /// The byte order of the machine running this code.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Eeei
        } else {
            Self::Ieee
        }
    }

    /// Select a byte order from an endianness flag.
    pub const fn from_little_endian(little: bool) -> Self {
        if little {
            Self::Eeei
        } else {
            Self::Ieee
        }
    }

    /// The four byte tag stored in the header.
    pub const fn tag(self) -> &'static [u8; 4] {
        match self {
            Self::Ieee => b"IEEE",
            Self::Eeei => b"EEEI",
        }
    }

    /// Parse a four byte tag.
    pub fn from_tag(tag: &[u8]) -> BlueResult<Self> {
        match tag {
            b"IEEE" => Ok(Self::Ieee),
            b"EEEI" => Ok(Self::Eeei),
            other => Err(BlueError::InvalidByteOrder(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Whether this is the little-endian representation.
    pub const fn is_little_endian(self) -> bool {
        matches!(self, Self::Eeei)
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ieee => "IEEE",
            Self::Eeei => "EEEI",
        })
    }
}

// ---------------------------------------------------------------------------
// Fixed-offset field access
// ---------------------------------------------------------------------------

macro_rules! put_fn {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self, offset: usize, value: $ty) {
            let bytes = match self.order {
                ByteOrder::Ieee => value.to_be_bytes(),
                ByteOrder::Eeei => value.to_le_bytes(),
            };
            self.buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
        }
    };
}

macro_rules! get_fn {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&self, offset: usize) -> BlueResult<$ty> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let raw: [u8; WIDTH] = self
                .buf
                .get(offset..offset + WIDTH)
                .and_then(|slice| slice.try_into().ok())
                .ok_or(BlueError::UnexpectedEof(offset))?;
            Ok(match self.order {
                ByteOrder::Ieee => <$ty>::from_be_bytes(raw),
                ByteOrder::Eeei => <$ty>::from_le_bytes(raw),
            })
        }
    };
}

/// Writes numbers into a fixed buffer at absolute offsets.
pub(crate) struct FieldWriter<'a> {
    buf: &'a mut [u8],
    order: ByteOrder,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8], order: ByteOrder) -> Self {
        Self { buf, order }
    }

    put_fn!(put_i16, i16);
    put_fn!(put_i32, i32);
    put_fn!(put_f64, f64);

    pub(crate) fn put_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

/// Reads numbers from a buffer at absolute offsets.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    order: ByteOrder,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, order }
    }

    get_fn!(get_i16, i16);
    get_fn!(get_i32, i32);
    get_fn!(get_f64, f64);

    pub(crate) fn get_bytes(&self, offset: usize, len: usize) -> BlueResult<&'a [u8]> {
        self.buf
            .get(offset..offset + len)
            .ok_or(BlueError::UnexpectedEof(offset))
    }
}
