// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Sample packets
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A packet is one timestamped chunk of samples of a single element type.
// Samples are held as a tagged union of typed vectors so one write path
// serves every element type; `SampleBuffer::to_bytes` produces the on-disk
// bytes, optionally swapping each element.

use serde::{Deserialize, Serialize};
use sigrec_bluefile::{DataMode, ElementFormat, FormatCode};

use crate::sri::{Sri, Timestamp};

// ---------------------------------------------------------------------------
// ElementType
// ---------------------------------------------------------------------------

/// Primitive element type of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Char,
    Octet,
    Short,
    UShort,
    Long,
    LongLong,
    Float,
    Double,
    /// Text carried as bytes.
    Xml,
}

impl ElementType {
    /// Every element type, in input-port order.
    pub const ALL: [ElementType; 9] = [
        Self::Char,
        Self::Octet,
        Self::Short,
        Self::UShort,
        Self::Long,
        Self::LongLong,
        Self::Float,
        Self::Double,
        Self::Xml,
    ];

    /// Width of one element in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Char | Self::Octet | Self::Xml => 1,
            Self::Short | Self::UShort => 2,
            Self::Long | Self::Float => 4,
            Self::LongLong | Self::Double => 8,
        }
    }

    /// Data type code used in file names, e.g. `16t` or `32fr`.
    ///
    /// Little-endian output of multi-byte elements gets an `r` suffix.
    pub fn data_type_code(self, little_endian: bool) -> String {
        let base = match self {
            Self::Char | Self::Xml => "8t",
            Self::Octet => "8o",
            Self::Short => "16t",
            Self::UShort => "16o",
            Self::Long => "32t",
            Self::LongLong => "64t",
            Self::Float => "32f",
            Self::Double => "64f",
        };
        if little_endian && self.width() > 1 {
            format!("{base}r")
        } else {
            base.to_string()
        }
    }

    /// The BLUE element format for this type.
    pub const fn blue_element(self) -> ElementFormat {
        match self {
            Self::Char | Self::Octet | Self::Xml => ElementFormat::Byte,
            Self::Short => ElementFormat::Int,
            Self::UShort => ElementFormat::UInt,
            Self::Long => ElementFormat::Long,
            Self::LongLong => ElementFormat::Xlong,
            Self::Float => ElementFormat::Float,
            Self::Double => ElementFormat::Double,
        }
    }

    pub const fn format_code(self, complex: bool) -> FormatCode {
        let mode = if complex {
            DataMode::Complex
        } else {
            DataMode::Scalar
        };
        FormatCode::new(mode, self.blue_element())
    }
}

// ---------------------------------------------------------------------------
// SampleBuffer
// ---------------------------------------------------------------------------

/// Samples of one element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "samples", rename_all = "lowercase")]
pub enum SampleBuffer {
    Char(Vec<i8>),
    Octet(Vec<u8>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Long(Vec<i32>),
    LongLong(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Xml(String),
}

/// Flatten a typed slice into host-order bytes, reversing each element when
/// `swap` is set.
macro_rules! element_bytes {
    ($samples:expr, $swap:expr) => {{
        let mut out = Vec::with_capacity(std::mem::size_of_val(&$samples[..]));
        for sample in $samples.iter() {
            let mut bytes = sample.to_ne_bytes();
            if $swap {
                bytes.reverse();
            }
            out.extend_from_slice(&bytes);
        }
        out
    }};
}

impl SampleBuffer {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Char(_) => ElementType::Char,
            Self::Octet(_) => ElementType::Octet,
            Self::Short(_) => ElementType::Short,
            Self::UShort(_) => ElementType::UShort,
            Self::Long(_) => ElementType::Long,
            Self::LongLong(_) => ElementType::LongLong,
            Self::Float(_) => ElementType::Float,
            Self::Double(_) => ElementType::Double,
            Self::Xml(_) => ElementType::Xml,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Char(v) => v.len(),
            Self::Octet(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::LongLong(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Xml(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().width()
    }

    /// Serialize to bytes in host order, or with every multi-byte element
    /// reversed when `swap` is set. Single-byte data is never swapped.
    pub fn to_bytes(&self, swap: bool) -> Vec<u8> {
        match self {
            Self::Char(v) => v.iter().map(|b| *b as u8).collect(),
            Self::Octet(v) => v.clone(),
            Self::Xml(s) => s.as_bytes().to_vec(),
            Self::Short(v) => element_bytes!(v, swap),
            Self::UShort(v) => element_bytes!(v, swap),
            Self::Long(v) => element_bytes!(v, swap),
            Self::LongLong(v) => element_bytes!(v, swap),
            Self::Float(v) => element_bytes!(v, swap),
            Self::Double(v) => element_bytes!(v, swap),
        }
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One unit of input to the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Nominal stream the packet arrived on.
    pub stream_id: String,
    pub timestamp: Timestamp,
    pub eos: bool,
    pub sri: Sri,
    /// The SRI differs from the previous packet of this stream.
    pub sri_changed: bool,
    pub input_queue_flushed: bool,
    pub data: SampleBuffer,
}

impl Packet {
    /// A packet whose SRI names the stream.
    pub fn new(sri: Sri, timestamp: Timestamp, data: SampleBuffer) -> Self {
        Self {
            stream_id: sri.stream_id.clone(),
            timestamp,
            eos: false,
            sri,
            sri_changed: false,
            input_queue_flushed: false,
            data,
        }
    }

    pub fn with_eos(mut self, eos: bool) -> Self {
        self.eos = eos;
        self
    }

    pub fn with_sri_changed(mut self, changed: bool) -> Self {
        self.sri_changed = changed;
        self
    }

    /// The stream id after the `STREAM_GROUP` override.
    pub fn effective_stream_id(&self) -> &str {
        self.sri.stream_group().unwrap_or(&self.stream_id)
    }

    /// End of stream for the effective stream. A grouped packet never ends
    /// the shared file.
    pub fn ends_stream(&self) -> bool {
        self.eos && self.effective_stream_id() == self.stream_id
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }
}
