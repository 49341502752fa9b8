// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Defines every error condition that can arise while encoding or decoding a
// BLUE header control block or its packed extended-header keyword region.

use thiserror::Error;

/// Errors that can occur while encoding or decoding BLUE headers.
#[derive(Debug, Error)]
pub enum BlueError {
    /// The buffer ended before a complete structure could be read.
    #[error("Unexpected end of BLUE header data at offset {0}")]
    UnexpectedEof(usize),

    /// The version field at offset 0 was not `BLUE`.
    #[error("Not a BLUE header: version field is {0:?}")]
    BadVersion(String),

    /// A representation tag was neither `IEEE` nor `EEEI`.
    #[error("Invalid byte order tag {0:?}")]
    InvalidByteOrder(String),

    /// The header declares a type code this codec does not handle.
    #[error("Unsupported BLUE type code {0}")]
    UnsupportedType(i32),

    /// The two-character format code could not be decoded.
    #[error("Invalid BLUE format code {0:?}")]
    InvalidFormat(String),

    /// An extended-header entry declared an unknown type character.
    #[error("Invalid keyword type code {0:#04x}")]
    InvalidKeywordType(u8),

    /// A keyword name does not fit the single-byte name length field.
    #[error("Keyword name {name:?} is {len} bytes, exceeding the 255 byte limit")]
    KeywordNameTooLong {
        /// The offending keyword name.
        name: String,
        /// Its length in bytes.
        len: usize,
    },

    /// An ASCII keyword value is empty or too long to be carried.
    #[error("ASCII keyword value of {len} bytes is not storable (must be 1..{max})")]
    UnstorableAscii {
        /// Length of the rejected value.
        len: usize,
        /// Exclusive upper bound on the value length.
        max: usize,
    },

    /// An ASCII keyword value holds characters outside 7-bit ASCII.
    #[error("ASCII keyword value {0:?} contains non-ASCII characters")]
    NonAsciiKeyword(String),

    /// The main-header keyword area (92 bytes) overflowed.
    #[error("Main header keywords need {needed} bytes, only {available} available")]
    MainKeywordsOverflow {
        /// Bytes required by the encoded keywords.
        needed: usize,
        /// Bytes available in the header control block.
        available: usize,
    },

    /// A decoded header failed a consistency check.
    #[error("BLUE header validation failed: {0}")]
    Invalid(String),

    /// A decoded string field was not valid UTF-8.
    #[error("Invalid UTF-8 in BLUE header: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Convenience type alias for BLUE codec results.
pub type BlueResult<T> = Result<T, BlueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unstorable_ascii() {
        let error = BlueError::UnstorableAscii { len: 80, max: 80 };
        let message = format!("{error}");
        assert!(message.contains("80"));
    }

    #[test]
    fn test_error_display_bad_version() {
        let error = BlueError::BadVersion("JUNK".to_string());
        assert!(format!("{error}").contains("JUNK"));
    }
}
