// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Metadata sidecar fragments
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The sidecar is an XML document written next to each data file, one
// fragment at a time:
//
// ```text
// <recording_metadata datafile="NAME">
// <sri new="true">...</sri>
// <packet>...</packet>
// ...
// </recording_metadata>
// ```

use std::path::{Path, PathBuf};

use crate::sri::{Sri, Timestamp};

/// Suffix appended to the data file name.
pub const METADATA_SUFFIX: &str = ".metadata.xml";

/// Closing root tag.
pub const CLOSE_TAG: &str = "</recording_metadata>\n";

/// Final sidecar path for a data file.
pub fn metadata_path(data_file: &Path) -> PathBuf {
    let mut name = data_file.as_os_str().to_os_string();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// Escape text for element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn element(out: &mut String, name: &str, value: impl ToString) {
    out.push_str(&format!("<{name}>{}</{name}>", escape(&value.to_string())));
}

/// Opening root tag naming the data file.
pub fn open_tag(datafile: &str) -> String {
    format!("<recording_metadata datafile=\"{}\">\n", escape(datafile))
}

/// An `<sri>` element. Keywords keep their arrival order.
pub fn sri_element(sri: &Sri, new: bool) -> String {
    let mut out = format!("<sri new=\"{new}\">");
    element(&mut out, "streamID", &sri.stream_id);
    element(&mut out, "hversion", sri.hversion);
    element(&mut out, "xstart", sri.xstart);
    element(&mut out, "xdelta", sri.xdelta);
    element(&mut out, "xunits", sri.xunits);
    element(&mut out, "subsize", sri.subsize);
    element(&mut out, "ystart", sri.ystart);
    element(&mut out, "ydelta", sri.ydelta);
    element(&mut out, "yunits", sri.yunits);
    element(&mut out, "mode", sri.mode);
    for keyword in &sri.keywords {
        out.push_str(&format!(
            "<keyword id=\"{}\" type=\"{}\">{}</keyword>",
            escape(&keyword.id),
            keyword.value.type_name(),
            escape(&keyword.value.to_string())
        ));
    }
    out.push_str("</sri>\n");
    out
}

/// A `<packet>` element for one written fragment.
pub fn packet_element(stream_id: &str, data_length: usize, eos: bool, timestamp: &Timestamp) -> String {
    let mut out = String::from("<packet>");
    element(&mut out, "streamID", stream_id);
    element(&mut out, "datalength", data_length);
    element(&mut out, "EOS", u8::from(eos));
    out.push_str("<timecode>");
    element(&mut out, "tcmode", timestamp.tcmode);
    element(&mut out, "tcstatus", timestamp.tcstatus);
    element(&mut out, "toff", timestamp.toff);
    element(&mut out, "twsec", timestamp.twsec);
    element(&mut out, "tfsec", timestamp.tfsec);
    out.push_str("</timecode></packet>\n");
    out
}
