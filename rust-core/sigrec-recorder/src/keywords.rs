// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Keyword merge table
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accumulates the SRI keywords seen by one open file. A later value for the
// same id replaces the earlier one; ids are kept sorted so the extended
// header they become has a deterministic layout.

use std::collections::BTreeMap;

use sigrec_bluefile::{BlueKeyword, ExtendedHeader};
use tracing::debug;

use crate::sri::{KeywordValue, Sri};

/// Keywords merged across every packet written to one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordTable {
    entries: BTreeMap<String, KeywordValue>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded from one SRI.
    pub fn from_sri(sri: &Sri) -> Self {
        let mut table = Self::new();
        table.merge(sri);
        table
    }

    /// Fold in every keyword of `sri`, replacing values with the same id.
    /// Keywords with an empty id are ignored.
    pub fn merge(&mut self, sri: &Sri) {
        for keyword in &sri.keywords {
            if keyword.id.is_empty() {
                continue;
            }
            self.entries
                .insert(keyword.id.clone(), keyword.value.clone());
        }
    }

    pub fn get(&self, id: &str) -> Option<&KeywordValue> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordValue)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    /// Convert to a BLUE extended header.
    ///
    /// Keywords the BLUE format cannot carry are skipped; the rest are
    /// still encoded.
    pub fn to_extended_header(&self) -> ExtendedHeader {
        let mut header = ExtendedHeader::new();
        for (id, value) in &self.entries {
            match value.to_blue() {
                Ok(blue) => header.insert(BlueKeyword::new(id.clone(), blue)),
                Err(e) => debug!(keyword = %id, error = %e, "Skipping keyword in extended header"),
            }
        }
        header
    }
}
