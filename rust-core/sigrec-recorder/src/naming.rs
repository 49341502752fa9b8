// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Filename templates
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Destination basenames are rendered from a template such as
// `%STREAMID%.%TIMESTAMP%.%MODE%.%SR%.%DT%`. Fixed tokens are substituted
// first, then one `%ID%` token per SRI keyword. Tokens with no value are
// left in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sri::{Sri, Timestamp, CHAN_RF_KEYWORD, COL_RF_KEYWORD};

/// Largest ten-digit fraction.
const MAX_FRACTION_DIGITS: f64 = 9_999_999_999.0;

/// Render a timestamp as `DDMonYYYY.HHMMSS`, optionally followed by `.` and
/// the fraction as ten zero-padded digits.
pub fn format_timestamp(ts: &Timestamp, with_fraction: bool) -> String {
    let whole = DateTime::<Utc>::from_timestamp(ts.twsec as i64, 0).unwrap_or_default();
    let mut out = whole.format("%d%b%Y.%H%M%S").to_string();
    if with_fraction {
        out.push('.');
        let fraction = (ts.tfsec * 1e10).round().clamp(0.0, MAX_FRACTION_DIGITS);
        out.push_str(&format!("{:010}", fraction as u64));
    }
    out
}

/// Case applied to rendered basenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameCase {
    #[default]
    Mixed,
    Lower,
    Upper,
}

impl FilenameCase {
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Mixed => name.to_string(),
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
        }
    }
}

/// Everything a template can refer to.
#[derive(Debug, Clone)]
pub struct NameContext<'a> {
    /// Effective stream id.
    pub stream_id: &'a str,
    pub sri: &'a Sri,
    /// Packet timestamp; replaced by `system_time` when invalid.
    pub timestamp: &'a Timestamp,
    pub system_time: &'a Timestamp,
    pub component_name: &'a str,
    /// `raw` or `bluefile`.
    pub extension: &'a str,
    /// Data type code, e.g. `16tr`.
    pub data_type: &'a str,
}

/// Integer-truncated frequency keyword followed by `Hz`, or empty.
fn hz_token(sri: &Sri, id: &str) -> String {
    sri.keyword_f64(id)
        .map(|hz| format!("{}Hz", hz.trunc() as i64))
        .unwrap_or_default()
}

/// Substitute every known token in `template`.
pub fn render_basename(template: &str, ctx: &NameContext<'_>) -> String {
    let packet_time = if ctx.timestamp.is_valid() {
        ctx.timestamp
    } else {
        ctx.system_time
    };
    let mode = if ctx.sri.is_complex() { "cplx" } else { "real" };
    let sample_rate = format!("{:.0}", ctx.sri.sample_rate());

    let fixed = [
        ("%STREAMID%", ctx.stream_id.to_string()),
        ("%TIMESTAMP%", format_timestamp(packet_time, true)),
        ("%TIMESTAMP_NO_FRACT%", format_timestamp(packet_time, false)),
        ("%SYSTEM_TIMESTAMP%", format_timestamp(ctx.system_time, true)),
        (
            "%SYSTEM_TIMESTAMP_NO_FRACT%",
            format_timestamp(ctx.system_time, false),
        ),
        ("%COMP_NS_NAME%", ctx.component_name.to_string()),
        ("%EXTENSION%", ctx.extension.to_lowercase()),
        ("%MODE%", mode.to_string()),
        ("%SR%", sample_rate),
        ("%DT%", ctx.data_type.to_string()),
    ];
    let mut name = template.to_string();
    for (token, value) in &fixed {
        name = name.replace(token, value);
    }

    for keyword in &ctx.sri.keywords {
        name = name.replace(&format!("%{}%", keyword.id), &keyword.value.to_string());
    }

    let col_rf = hz_token(ctx.sri, COL_RF_KEYWORD);
    let chan_rf = hz_token(ctx.sri, CHAN_RF_KEYWORD);
    let cf = if !chan_rf.is_empty() {
        chan_rf.clone()
    } else if !col_rf.is_empty() {
        col_rf.clone()
    } else {
        "Hz".to_string()
    };
    name.replace("%CF_HZ%", &cf)
        .replace("%COLRF_HZ%", &col_rf)
        .replace("%CHANRF_HZ%", &chan_rf)
}
