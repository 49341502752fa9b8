// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Stream description types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signal recording information (SRI) travels with every packet and describes
// the sample spacing, axis units, real/complex mode and an open-ended list of
// typed keywords. Timestamps are split into whole and fractional seconds
// since 1970 so sub-nanosecond offsets survive.

use std::cmp::Ordering;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sigrec_bluefile::{BlueResult, BlueValue};

/// Keyword that funnels several streams into one file.
pub const STREAM_GROUP_KEYWORD: &str = "STREAM_GROUP";
/// Collection (tuner) centre frequency keyword.
pub const COL_RF_KEYWORD: &str = "COL_RF";
/// Channel centre frequency keyword.
pub const CHAN_RF_KEYWORD: &str = "CHAN_RF";

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// A precision timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamp {
    pub tcmode: i16,
    /// 1 when the timestamp is valid.
    pub tcstatus: i16,
    pub toff: f64,
    /// Whole seconds since 1970-01-01 UTC.
    pub twsec: f64,
    /// Fractional seconds in `[0, 1)`.
    pub tfsec: f64,
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Timestamp {
    pub const STATUS_VALID: i16 = 1;
    pub const STATUS_INVALID: i16 = 0;

    pub fn new(twsec: f64, tfsec: f64) -> Self {
        Self {
            tcmode: 1,
            tcstatus: Self::STATUS_VALID,
            toff: 0.0,
            twsec,
            tfsec,
        }
    }

    /// The current system time.
    pub fn now() -> Self {
        let now = Utc::now();
        Self::new(
            now.timestamp() as f64,
            f64::from(now.timestamp_subsec_nanos()) / 1e9,
        )
    }

    /// A timestamp flagged as invalid.
    pub fn invalid() -> Self {
        Self {
            tcstatus: Self::STATUS_INVALID,
            ..Self::default()
        }
    }

    /// Whether the status flag is set, `twsec` is in range and `tfsec` is a
    /// fraction in `[0, 1)`.
    pub fn is_valid(&self) -> bool {
        self.tcstatus != Self::STATUS_INVALID
            && self.twsec.is_finite()
            && (0.0..=1e10).contains(&self.twsec)
            && (0.0..1.0).contains(&self.tfsec)
    }

    pub fn seconds(&self) -> f64 {
        self.twsec + self.tfsec
    }

    /// Shift forward by `seconds`, carrying between the whole and fractional
    /// parts so `tfsec` stays in `[0, 1)`.
    pub fn advanced_by(&self, seconds: f64) -> Self {
        let whole = seconds.trunc();
        let mut out = *self;
        out.twsec += whole;
        out.tfsec += seconds - whole;
        let carry = out.tfsec.floor();
        out.twsec += carry;
        out.tfsec -= carry;
        // A tiny negative fraction rounds up to exactly 1.0.
        if out.tfsec >= 1.0 {
            out.tfsec -= 1.0;
            out.twsec += 1.0;
        }
        out
    }

    /// Order by whole then fractional seconds.
    pub fn cmp_time(&self, twsec: f64, tfsec: f64) -> Ordering {
        self.twsec
            .total_cmp(&twsec)
            .then_with(|| self.tfsec.total_cmp(&tfsec))
    }
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// A typed SRI keyword value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum KeywordValue {
    Short(i16),
    Long(i32),
    Char(i8),
    Octet(u8),
    LongLong(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl KeywordValue {
    /// The type name used in metadata sidecars.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Short(_) => "short",
            Self::Long(_) => "long",
            Self::Char(_) => "char",
            Self::Octet(_) => "octet",
            Self::LongLong(_) => "longlong",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
        }
    }

    /// Numeric value as f64; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Self::Short(v) => f64::from(*v),
            Self::Long(v) => f64::from(*v),
            Self::Char(v) => f64::from(*v),
            Self::Octet(v) => f64::from(*v),
            Self::LongLong(v) => *v as f64,
            Self::Float(v) => f64::from(*v),
            Self::Double(v) => *v,
            Self::String(_) => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a BLUE extended-header value.
    ///
    /// Fails for strings the BLUE format cannot carry (empty, or 80
    /// characters and longer).
    pub fn to_blue(&self) -> BlueResult<BlueValue> {
        Ok(match self {
            Self::Short(v) => BlueValue::Int(*v),
            Self::Long(v) => BlueValue::Long(*v),
            Self::Char(v) => BlueValue::Byte(*v),
            Self::Octet(v) => BlueValue::Octet(*v),
            Self::LongLong(v) => BlueValue::Xlong(*v),
            Self::Float(v) => BlueValue::Float(*v),
            Self::Double(v) => BlueValue::Double(*v),
            Self::String(s) => BlueValue::ascii(s.as_str())?,
        })
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Octet(v) => write!(f, "{v}"),
            Self::LongLong(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// One `id -> value` SRI keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub value: KeywordValue,
}

// ---------------------------------------------------------------------------
// Sri
// ---------------------------------------------------------------------------

/// Signal recording information for one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sri {
    pub stream_id: String,
    pub hversion: i32,
    pub xstart: f64,
    /// Seconds between samples.
    pub xdelta: f64,
    pub xunits: i16,
    /// Columns per frame; 0 for one-dimensional data.
    pub subsize: i32,
    pub ystart: f64,
    pub ydelta: f64,
    pub yunits: i16,
    /// 0 for real samples, 1 for complex.
    pub mode: i16,
    pub blocking: bool,
    pub keywords: Vec<Keyword>,
}

impl Default for Sri {
    fn default() -> Self {
        Self {
            stream_id: String::new(),
            hversion: 1,
            xstart: 0.0,
            xdelta: 1.0,
            xunits: 1,
            subsize: 0,
            ystart: 0.0,
            ydelta: 0.0,
            yunits: 0,
            mode: 0,
            blocking: false,
            keywords: Vec::new(),
        }
    }
}

impl Sri {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            ..Self::default()
        }
    }

    pub fn with_xdelta(mut self, xdelta: f64) -> Self {
        self.xdelta = xdelta;
        self
    }

    pub fn with_mode(mut self, mode: i16) -> Self {
        self.mode = mode;
        self
    }

    /// Set a keyword, replacing an existing one with the same id.
    pub fn with_keyword(mut self, id: impl Into<String>, value: KeywordValue) -> Self {
        self.set_keyword(id, value);
        self
    }

    pub fn set_keyword(&mut self, id: impl Into<String>, value: KeywordValue) {
        let id = id.into();
        match self.keywords.iter_mut().find(|k| k.id == id) {
            Some(existing) => existing.value = value,
            None => self.keywords.push(Keyword { id, value }),
        }
    }

    pub fn keyword(&self, id: &str) -> Option<&KeywordValue> {
        self.keywords.iter().find(|k| k.id == id).map(|k| &k.value)
    }

    /// A numeric keyword, if present.
    pub fn keyword_f64(&self, id: &str) -> Option<f64> {
        self.keyword(id).and_then(KeywordValue::as_f64)
    }

    /// The `STREAM_GROUP` override, if present.
    pub fn stream_group(&self) -> Option<&str> {
        self.keyword(STREAM_GROUP_KEYWORD)
            .and_then(KeywordValue::as_str)
    }

    pub fn is_complex(&self) -> bool {
        self.mode == 1
    }

    /// Elements per sample (2 for complex data).
    pub fn elements_per_sample(&self) -> usize {
        if self.is_complex() {
            2
        } else {
            1
        }
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.xdelta
    }

    /// Whether `other` describes a retuned signal: a different sample
    /// spacing, mode or centre frequency. A missing frequency keyword counts
    /// as zero.
    pub fn is_retuned(&self, other: &Sri) -> bool {
        let freq = |sri: &Sri, id: &str| sri.keyword_f64(id).unwrap_or(0.0);
        self.xdelta != other.xdelta
            || self.mode != other.mode
            || freq(self, COL_RF_KEYWORD) != freq(other, COL_RF_KEYWORD)
            || freq(self, CHAN_RF_KEYWORD) != freq(other, CHAN_RF_KEYWORD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advanced_by_carries_fraction() {
        let ts = Timestamp::new(10.0, 0.75).advanced_by(0.5);
        assert_eq!(ts.twsec, 11.0);
        assert!((ts.tfsec - 0.25).abs() < 1e-12);

        let ts = Timestamp::new(10.0, 0.25).advanced_by(2.5);
        assert_eq!(ts.twsec, 12.0);
        assert!((ts.tfsec - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_timestamps() {
        assert!(!Timestamp::invalid().is_valid());
        assert!(!Timestamp::new(f64::NAN, 0.0).is_valid());
        assert!(!Timestamp::new(-1.0, 0.0).is_valid());
        assert!(Timestamp::new(1_700_000_000.0, 0.5).is_valid());
        assert!(!Timestamp::new(0.0, 1.0).is_valid());
        assert!(!Timestamp::new(0.0, 5e8).is_valid());
        assert!(!Timestamp::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_advanced_by_normalizes_large_fraction_at_once() {
        let ts = Timestamp::new(0.0, 5e8).advanced_by(0.25);
        assert_eq!(ts.twsec, 500_000_000.0);
        assert!((ts.tfsec - 0.25).abs() < 1e-6);

        let ts = Timestamp::new(10.0, 0.25).advanced_by(-0.5);
        assert_eq!(ts.twsec, 9.0);
        assert!((ts.tfsec - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_cmp_time() {
        let ts = Timestamp::new(5.0, 0.5);
        assert_eq!(ts.cmp_time(5.0, 0.5), Ordering::Equal);
        assert_eq!(ts.cmp_time(5.0, 0.6), Ordering::Less);
        assert_eq!(ts.cmp_time(4.0, 0.9), Ordering::Greater);
    }

    #[test]
    fn test_keyword_lookup_and_replace() {
        let mut sri = Sri::new("s1")
            .with_keyword("COL_RF", KeywordValue::Double(1.0e9))
            .with_keyword(STREAM_GROUP_KEYWORD, KeywordValue::String("grp".into()));
        sri.set_keyword("COL_RF", KeywordValue::Float(2.0));
        assert_eq!(sri.keywords.len(), 2);
        assert_eq!(sri.keyword_f64("COL_RF"), Some(2.0));
        assert_eq!(sri.stream_group(), Some("grp"));
    }

    #[test]
    fn test_retune_detection_fields() {
        let base = Sri::new("s").with_xdelta(1e-3);
        assert!(!base.is_retuned(&base.clone()));
        assert!(base.is_retuned(&base.clone().with_xdelta(2e-3)));
        assert!(base.is_retuned(&base.clone().with_mode(1)));
        assert!(base.is_retuned(
            &base.clone().with_keyword("CHAN_RF", KeywordValue::Double(1.0))
        ));
        // Explicit zero matches a missing keyword.
        assert!(!base.is_retuned(
            &base.clone().with_keyword("COL_RF", KeywordValue::Double(0.0))
        ));
        // Fields outside the comparison set do not retune.
        let mut moved = base.clone();
        moved.xstart = 42.0;
        assert!(!base.is_retuned(&moved));
    }

    #[test]
    fn test_string_keyword_to_blue_is_fallible() {
        assert!(KeywordValue::String(String::new()).to_blue().is_err());
        assert!(KeywordValue::String("x".repeat(80)).to_blue().is_err());
        assert_eq!(
            KeywordValue::Short(3).to_blue().unwrap(),
            BlueValue::Int(3)
        );
    }

    #[test]
    fn test_keyword_value_serde_shape() {
        let json = serde_json::to_string(&KeywordValue::LongLong(7)).unwrap();
        assert_eq!(json, r#"{"type":"longlong","value":7}"#);
    }
}
