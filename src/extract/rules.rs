//! Extraction rule primitives and the cascade runner
//!
//! A cascade is an ordered list of named rules for one field. Rules are
//! tried in priority order; the first non-empty result wins. An exhausted
//! cascade resolves to absent and records a `FieldNote` (low severity,
//! never an error).

use crate::records::DegreeType;
use std::collections::BTreeSet;

/// Low-severity note produced when a field's rule cascade is exhausted
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNote {
    /// The field whose cascade was exhausted
    pub field: &'static str,

    /// Where the field was being extracted from (page or entry URL)
    pub context: String,
}

/// Rule cascade for a single field
pub struct Cascade<T> {
    field: &'static str,
    value: Option<T>,
}

impl<T> Cascade<T> {
    /// Starts a cascade for the named field
    pub fn field(name: &'static str) -> Self {
        Self {
            field: name,
            value: None,
        }
    }

    /// Tries one named rule; skipped if an earlier rule already won
    ///
    /// The rule name documents the cascade's priority order at the call
    /// site; it is not otherwise interpreted.
    pub fn rule(mut self, _name: &'static str, apply: impl FnOnce() -> Option<T>) -> Self {
        if self.value.is_none() {
            self.value = apply();
        }
        self
    }

    /// Resolves the cascade, noting an exhausted one
    pub fn resolve(self, context: &str, notes: &mut Vec<FieldNote>) -> Option<T> {
        if self.value.is_none() {
            notes.push(FieldNote {
                field: self.field,
                context: context.to_string(),
            });
        }
        self.value
    }

    /// Resolves the cascade without noting absence
    ///
    /// Used where an absent value means "not applicable" rather than
    /// "extraction failed" (e.g. a block that is not a listing entry).
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// Returns the first whitespace-delimited token following a labeled marker
///
/// `"國家: 克羅埃西亞 城市: ..."` with marker `"國家:"` yields `克羅埃西亞`.
/// The source directory renders each labeled value as a single token, so the
/// capture stops at the next whitespace.
pub fn token_after_marker(text: &str, marker: &str) -> Option<String> {
    let start = text.find(marker)? + marker.len();
    text[start..]
        .split_whitespace()
        .next()
        .map(str::to_string)
}

/// Parses the token following a labeled marker as a non-negative integer
///
/// A token that does not parse yields None, never an error.
pub fn integer_after_marker(text: &str, marker: &str) -> Option<u32> {
    token_after_marker(text, marker)?.parse().ok()
}

/// Scans text for the fixed degree vocabulary
///
/// Case-insensitive substring match; order-independent and
/// duplicate-suppressing. `PhD` is also detected in its dotted spelling
/// (`Ph.D`), which the source site uses.
pub fn find_degree_types(text: &str) -> BTreeSet<DegreeType> {
    let lowered = text.to_lowercase();
    let mut found = BTreeSet::new();

    if lowered.contains("bachelor") {
        found.insert(DegreeType::Bachelor);
    }
    if lowered.contains("master") {
        found.insert(DegreeType::Master);
    }
    if lowered.contains("phd") || lowered.contains("ph.d") {
        found.insert(DegreeType::Phd);
    }

    found
}
