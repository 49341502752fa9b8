// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Format codes
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A BLUE format code is two characters: the first gives the sample mode
// (`S` scalar, `C` complex), the second the element type.

use std::fmt;

use crate::error::{BlueError, BlueResult};

/// Scalar or complex samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataMode {
    /// One element per sample (`S`).
    Scalar,
    /// Two interleaved elements per sample (`C`).
    Complex,
}

impl DataMode {
    /// Elements making up one sample.
    pub const fn elements_per_sample(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Complex => 2,
        }
    }

    fn letter(self) -> u8 {
        match self {
            Self::Scalar => b'S',
            Self::Complex => b'C',
        }
    }
}

/// Element storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementFormat {
    /// 8-bit integer (`B`).
    Byte,
    /// 16-bit signed integer (`I`).
    Int,
    /// 16-bit unsigned integer (`U`).
    UInt,
    /// 32-bit signed integer (`L`).
    Long,
    /// 64-bit signed integer (`X`).
    Xlong,
    /// 32-bit float (`F`).
    Float,
    /// 64-bit float (`D`).
    Double,
}

impl ElementFormat {
    /// Width of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Int | Self::UInt => 2,
            Self::Long | Self::Float => 4,
            Self::Xlong | Self::Double => 8,
        }
    }

    fn letter(self) -> u8 {
        match self {
            Self::Byte => b'B',
            Self::Int => b'I',
            Self::UInt => b'U',
            Self::Long => b'L',
            Self::Xlong => b'X',
            Self::Float => b'F',
            Self::Double => b'D',
        }
    }

    fn from_letter(letter: u8) -> Option<Self> {
        Some(match letter {
            b'B' => Self::Byte,
            b'I' => Self::Int,
            b'U' => Self::UInt,
            b'L' => Self::Long,
            b'X' => Self::Xlong,
            b'F' => Self::Float,
            b'D' => Self::Double,
            _ => return None,
        })
    }
}

/// A complete two-character format code such as `SI` or `CF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatCode {
    pub mode: DataMode,
    pub element: ElementFormat,
}

impl FormatCode {
    pub const fn new(mode: DataMode, element: ElementFormat) -> Self {
        Self { mode, element }
    }

    /// The two bytes stored at offset 52 of the header.
    pub fn to_bytes(self) -> [u8; 2] {
        [self.mode.letter(), self.element.letter()]
    }

    /// Decode the two bytes stored in the header.
    pub fn from_bytes(bytes: [u8; 2]) -> BlueResult<Self> {
        let mode = match bytes[0] {
            b'S' => DataMode::Scalar,
            b'C' => DataMode::Complex,
            _ => return Err(Self::invalid(bytes)),
        };
        let element = ElementFormat::from_letter(bytes[1]).ok_or_else(|| Self::invalid(bytes))?;
        Ok(Self { mode, element })
    }

    /// Bytes occupied by one sample.
    pub const fn sample_size(self) -> usize {
        self.mode.elements_per_sample() * self.element.size()
    }

    fn invalid(bytes: [u8; 2]) -> BlueError {
        BlueError::InvalidFormat(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [mode, element] = self.to_bytes();
        write!(f, "{}{}", mode as char, element as char)
    }
}
