//! Domain records for the partner-school harvest
//!
//! This module defines the data carried through the pipeline:
//! - `RawListEntry`: what one listing row yields, keyed by its detail URL
//! - `DetailFields`: what a detail page contributes
//! - `SchoolRecord`: the canonical merged unit persisted to the store
//! - `DegreeType`: the fixed degree vocabulary

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use url::Url;

/// Degree levels offered for exchange students
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegreeType {
    Bachelor,
    Master,
    #[serde(rename = "PhD")]
    Phd,
}

impl DegreeType {
    /// All vocabulary entries, in canonical order
    pub const ALL: [DegreeType; 3] = [DegreeType::Bachelor, DegreeType::Master, DegreeType::Phd];

    /// Converts to the string stored in the database
    pub fn to_db_string(self) -> &'static str {
        match self {
            DegreeType::Bachelor => "Bachelor",
            DegreeType::Master => "Master",
            DegreeType::Phd => "PhD",
        }
    }

    /// Parses the database representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "Bachelor" => Some(DegreeType::Bachelor),
            "Master" => Some(DegreeType::Master),
            "PhD" => Some(DegreeType::Phd),
            _ => None,
        }
    }
}

impl fmt::Display for DegreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Serializes a degree set to its JSON database column representation
pub fn degree_set_to_json(degrees: &BTreeSet<DegreeType>) -> String {
    let names: Vec<&str> = degrees.iter().map(|d| d.to_db_string()).collect();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}

/// Parses the JSON database column back into a degree set
///
/// Unknown entries are dropped rather than failing the row.
pub fn degree_set_from_json(json: &str) -> BTreeSet<DegreeType> {
    let names: Vec<String> = serde_json::from_str(json).unwrap_or_default();
    names
        .iter()
        .filter_map(|n| DegreeType::from_db_string(n))
        .collect()
}

/// One row of the paginated listing
///
/// Ephemeral: lives only within a single harvest run. The `detail_url` is the
/// join key to enrichment and becomes the record's `source_page_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListEntry {
    pub name: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub exchange_quota: Option<u32>,
    pub degree_types: BTreeSet<DegreeType>,
    pub image_url: Option<String>,
    pub detail_url: Url,
}

impl RawListEntry {
    /// Builds a SchoolRecord by merging detail-page fields onto this entry
    pub fn into_record(self, detail: DetailFields) -> SchoolRecord {
        SchoolRecord {
            name: self.name,
            country: self.country,
            city: self.city,
            exchange_quota: self.exchange_quota,
            degree_types: self.degree_types,
            description: detail.description,
            official_website: detail.official_website,
            location_info: detail.location_info,
            image_url: self.image_url,
            source_page_url: self.detail_url.to_string(),
        }
    }

    /// Builds a SchoolRecord from listing fields only (detail fields absent)
    pub fn into_partial_record(self) -> SchoolRecord {
        self.into_record(DetailFields::default())
    }
}

/// Fields contributed by a school's detail page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub description: Option<String>,
    pub official_website: Option<String>,
    pub location_info: Option<String>,
}

/// The canonical unit of harvest output
///
/// `source_page_url` uniquely identifies a school across runs; after
/// normalization `name` is never blank. Persisted as an upsert keyed on
/// `source_page_url` and never deleted by the harvester.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolRecord {
    pub name: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub exchange_quota: Option<u32>,
    pub degree_types: BTreeSet<DegreeType>,
    pub description: Option<String>,
    pub official_website: Option<String>,
    pub location_info: Option<String>,
    pub image_url: Option<String>,
    pub source_page_url: String,
}
