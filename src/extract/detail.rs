//! Detail-page extraction
//!
//! Maps a school's detail-page snapshot to the fields the listing does not
//! carry: the free-text description, the school's own website, and location
//! information.

use crate::extract::rules::{Cascade, FieldNote};
use crate::records::DetailFields;
use crate::snapshot::PageSnapshot;

/// A paragraph at least this long is taken as the school description outright
const DESCRIPTION_MIN_CHARS: usize = 40;

/// Text markers identifying location blocks
const LOCATION_MARKERS: [&str; 4] = ["Location", "Address", "地址", "位置"];

/// Extracts detail fields from a detail-page snapshot
///
/// Every field resolves through its rule cascade; an exhausted cascade
/// leaves the field absent and attaches a low-severity note.
pub fn extract_detail_fields(snapshot: &PageSnapshot, notes: &mut Vec<FieldNote>) -> DetailFields {
    let context = snapshot
        .url
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_default();

    let description = Cascade::field("description")
        .rule("long-paragraph", || {
            snapshot
                .paragraphs
                .iter()
                .find(|p| p.chars().count() >= DESCRIPTION_MIN_CHARS)
                .cloned()
        })
        .rule("first-paragraph", || snapshot.paragraphs.first().cloned())
        .resolve(&context, notes);

    let official_website = Cascade::field("official_website")
        .rule("off-host-anchor", || {
            let page_host = snapshot.url.as_ref().and_then(|u| u.host_str());
            snapshot
                .anchors()
                .find(|a| a.href.host_str().is_some() && a.href.host_str() != page_host)
                .map(|a| a.href.to_string())
        })
        .resolve(&context, notes);

    let location_info = Cascade::field("location_info")
        .rule("location-marker-blocks", || {
            let matching: Vec<&str> = snapshot
                .blocks
                .iter()
                .filter(|b| LOCATION_MARKERS.iter().any(|m| b.text.contains(m)))
                .map(|b| b.text.as_str())
                .collect();

            if matching.is_empty() {
                None
            } else {
                Some(matching.join(" "))
            }
        })
        .resolve(&context, notes);

    DetailFields {
        description,
        official_website,
        location_info,
    }
}
