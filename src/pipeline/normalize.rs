//! Normalization, validation, and deduplication
//!
//! `normalize` cleans one merged record and rejects unusable ones. The only
//! mandatory fields are a non-blank name and a source page URL; everything
//! else may be absent.
//!
//! `RecordSet` deduplicates within a run by source page URL. Merging is a
//! union: a record's present fields win over a later record's, absent fields
//! are filled from it, and degree sets are unioned. The merge is commutative
//! for disjoint contributions and idempotent for identical inputs, which
//! makes the final record set independent of enrichment completion order.

use crate::records::{RawListEntry, SchoolRecord};
use crate::report::CrawlRunReport;
use crate::snapshot::collapse_whitespace;
use std::collections::HashMap;
use std::fmt;

/// Why a record was rejected by validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Name is blank after normalization
    BlankName,

    /// Source page URL is missing
    MissingSourceUrl,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BlankName => f.write_str("name is blank"),
            RejectReason::MissingSourceUrl => f.write_str("source page URL is missing"),
        }
    }
}

/// Normalizes a merged record, rejecting unusable ones
///
/// Trims and collapses whitespace in every text field, canonicalizes country
/// and city casing, and validates the two mandatory fields.
pub fn normalize(record: SchoolRecord) -> Result<SchoolRecord, RejectReason> {
    let name = collapse_whitespace(&record.name);
    if name.is_empty() {
        return Err(RejectReason::BlankName);
    }

    let source_page_url = record.source_page_url.trim().to_string();
    if source_page_url.is_empty() {
        return Err(RejectReason::MissingSourceUrl);
    }

    Ok(SchoolRecord {
        name,
        country: clean_text(record.country).map(|s| canonical_case(&s)),
        city: clean_text(record.city).map(|s| canonical_case(&s)),
        exchange_quota: record.exchange_quota,
        degree_types: record.degree_types,
        description: clean_text(record.description),
        official_website: clean_text(record.official_website),
        location_info: clean_text(record.location_info),
        image_url: clean_text(record.image_url),
        source_page_url,
    })
}

/// Collapses whitespace and turns empty strings into absence
fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
}

/// Canonicalizes the casing of a place name
///
/// ASCII words that arrive in a single case are title-cased: all-lowercase
/// words always, all-uppercase words only when longer than three characters
/// (so acronyms like USA or UK survive). Mixed-case words and non-cased
/// scripts are left untouched.
fn canonical_case(s: &str) -> String {
    s.split(' ')
        .map(canonical_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn canonical_case_word(word: &str) -> String {
    let has_lower = word.chars().any(|c| c.is_lowercase());
    let has_upper = word.chars().any(|c| c.is_uppercase());

    let title_case = |w: &str| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            }
            None => String::new(),
        }
    };

    if has_lower && !has_upper {
        title_case(word)
    } else if has_upper && !has_lower && word.chars().count() > 3 {
        title_case(word)
    } else {
        word.to_string()
    }
}

/// Union-merges two records sharing a source page URL
///
/// The earlier record's present fields win; its absent fields are filled
/// from the later record; degree sets are unioned. An empty earlier name is
/// replaced by the later one.
pub fn merge_records(earlier: SchoolRecord, later: &SchoolRecord) -> SchoolRecord {
    let mut degree_types = earlier.degree_types;
    degree_types.extend(later.degree_types.iter().copied());

    SchoolRecord {
        name: if earlier.name.is_empty() {
            later.name.clone()
        } else {
            earlier.name
        },
        country: earlier.country.or_else(|| later.country.clone()),
        city: earlier.city.or_else(|| later.city.clone()),
        exchange_quota: earlier.exchange_quota.or(later.exchange_quota),
        degree_types,
        description: earlier.description.or_else(|| later.description.clone()),
        official_website: earlier
            .official_website
            .or_else(|| later.official_website.clone()),
        location_info: earlier
            .location_info
            .or_else(|| later.location_info.clone()),
        image_url: earlier.image_url.or_else(|| later.image_url.clone()),
        source_page_url: earlier.source_page_url,
    }
}

/// What absorbing a record into a `RecordSet` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbOutcome {
    /// First record for its key
    Inserted,

    /// A duplicate key contributing at least one new value
    Merged,

    /// A duplicate identical to the stored record (no-op)
    Identical,
}

/// Per-run record accumulator, deduplicated by source page URL
#[derive(Debug, Default)]
pub struct RecordSet {
    records: HashMap<String, SchoolRecord>,
    order: Vec<String>,
}

impl RecordSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs one normalized record
    pub fn absorb(&mut self, record: SchoolRecord) -> AbsorbOutcome {
        let key = record.source_page_url.clone();

        match self.records.remove(&key) {
            None => {
                self.order.push(key.clone());
                self.records.insert(key, record);
                AbsorbOutcome::Inserted
            }
            Some(existing) => {
                if existing == record {
                    self.records.insert(key, existing);
                    return AbsorbOutcome::Identical;
                }
                let merged = merge_records(existing, &record);
                self.records.insert(key, merged);
                AbsorbOutcome::Merged
            }
        }
    }

    /// Number of distinct records in the set
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the set holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the set, yielding records in first-seen order
    pub fn into_records(mut self) -> Vec<SchoolRecord> {
        self.order
            .iter()
            .filter_map(|key| self.records.remove(key))
            .collect()
    }
}

/// Union-merges duplicate listing entries before enrichment
///
/// Listing pages occasionally repeat a school; merging here ensures each
/// detail page is fetched once. Each merged duplicate is counted in the run
/// report.
pub fn dedup_entries(entries: Vec<RawListEntry>, report: &CrawlRunReport) -> Vec<RawListEntry> {
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<RawListEntry> = Vec::new();

    for entry in entries {
        let key = entry.detail_url.to_string();

        match by_url.get(&key) {
            None => {
                by_url.insert(key, unique.len());
                unique.push(entry);
            }
            Some(&index) => {
                let existing = &unique[index];
                if *existing == entry {
                    continue;
                }
                unique[index] = merge_entry(unique[index].clone(), &entry);
                report.duplicate_merged();
            }
        }
    }

    unique
}

/// Union-merge for listing entries, mirroring `merge_records`
fn merge_entry(earlier: RawListEntry, later: &RawListEntry) -> RawListEntry {
    let mut degree_types = earlier.degree_types;
    degree_types.extend(later.degree_types.iter().copied());

    RawListEntry {
        name: if earlier.name.is_empty() {
            later.name.clone()
        } else {
            earlier.name
        },
        country: earlier.country.or_else(|| later.country.clone()),
        city: earlier.city.or_else(|| later.city.clone()),
        exchange_quota: earlier.exchange_quota.or(later.exchange_quota),
        degree_types,
        image_url: earlier.image_url.or_else(|| later.image_url.clone()),
        detail_url: earlier.detail_url,
    }
}
