//! Listing-page extraction
//!
//! Maps one listing-page snapshot to zero or more `RawListEntry` values. A
//! block is an entry candidate iff it carries a detail-page anchor; all
//! other blocks (headers, pagers, footers) are ignored without noise.

use crate::extract::rules::{
    find_degree_types, integer_after_marker, token_after_marker, Cascade, FieldNote,
};
use crate::records::RawListEntry;
use crate::snapshot::{Anchor, Block, PageSnapshot};
use std::collections::HashSet;

/// Labeled markers for the country field, in priority order
const COUNTRY_MARKERS: [&str; 2] = ["國家:", "Country:"];

/// Labeled markers for the city field, in priority order
const CITY_MARKERS: [&str; 2] = ["城市:", "City:"];

/// Labeled markers for the exchange quota field, in priority order
const QUOTA_MARKERS: [&str; 3] = ["交換名額:", "Exchange quota:", "Quota:"];

/// Extracts listing entries from a page snapshot
///
/// Entries are yielded in display order. Blocks that repeat an already-seen
/// detail URL (nested table rows produce overlapping blocks) are skipped,
/// keeping the first occurrence.
///
/// # Arguments
///
/// * `snapshot` - The listing-page snapshot
/// * `detail_pattern` - Path fragment identifying detail-page links
/// * `notes` - Sink for low-severity extraction notes
pub fn extract_list_entries(
    snapshot: &PageSnapshot,
    detail_pattern: &str,
    notes: &mut Vec<FieldNote>,
) -> Vec<RawListEntry> {
    let mut entries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for block in &snapshot.blocks {
        let Some(anchor) = find_detail_anchor(block, snapshot, detail_pattern) else {
            continue;
        };

        if !seen.insert(anchor.href.to_string()) {
            continue;
        }

        entries.push(extract_entry(block, &anchor, notes));
    }

    entries
}

/// Finds the detail-page anchor of a block, if the block is an entry
fn find_detail_anchor(block: &Block, snapshot: &PageSnapshot, detail_pattern: &str) -> Option<Anchor> {
    Cascade::field("detail_url")
        .rule("detail-path-anchor", || {
            block
                .anchors
                .iter()
                .find(|a| a.href.path().contains(detail_pattern))
                .cloned()
        })
        .rule("same-host-anchor", || {
            let page_host = snapshot.url.as_ref().and_then(|u| u.host_str())?;
            block
                .anchors
                .iter()
                .find(|a| {
                    a.href.host_str() == Some(page_host)
                        && !a.text.is_empty()
                        && !is_pager_anchor(a)
                })
                .cloned()
        })
        .into_value()
}

/// Extracts all fields of one entry from its block
fn extract_entry(block: &Block, anchor: &Anchor, notes: &mut Vec<FieldNote>) -> RawListEntry {
    let context = anchor.href.as_str();

    let name = Cascade::field("name")
        .rule("detail-anchor-text", || {
            if anchor.text.is_empty() {
                None
            } else {
                Some(anchor.text.clone())
            }
        })
        .rule("block-text-prefix", || text_before_first_marker(&block.text))
        .resolve(context, notes)
        .unwrap_or_default();

    let country = Cascade::field("country")
        .rule("labeled-marker", || {
            first_marker_token(&block.text, &COUNTRY_MARKERS)
        })
        .resolve(context, notes);

    let city = Cascade::field("city")
        .rule("labeled-marker", || {
            first_marker_token(&block.text, &CITY_MARKERS)
        })
        .resolve(context, notes);

    // Unparseable quota is absent, never an error; absence is routine enough
    // on the listing that it carries no note.
    let exchange_quota = Cascade::field("exchange_quota")
        .rule("labeled-marker", || {
            QUOTA_MARKERS
                .iter()
                .find_map(|m| integer_after_marker(&block.text, m))
        })
        .into_value();

    let image_url = Cascade::field("image_url")
        .rule("first-block-image", || {
            block.images.first().map(|u| u.to_string())
        })
        .into_value();

    RawListEntry {
        name,
        country,
        city,
        exchange_quota,
        degree_types: find_degree_types(&block.text),
        image_url,
        detail_url: anchor.href.clone(),
    }
}

/// Tries each marker in priority order
fn first_marker_token(text: &str, markers: &[&str]) -> Option<String> {
    markers.iter().find_map(|m| token_after_marker(text, m))
}

/// Block text up to the first labeled marker (name fallback)
fn text_before_first_marker(text: &str) -> Option<String> {
    let cut = COUNTRY_MARKERS
        .iter()
        .chain(CITY_MARKERS.iter())
        .chain(QUOTA_MARKERS.iter())
        .filter_map(|m| text.find(m))
        .min()
        .unwrap_or(text.len());

    let prefix = text[..cut].trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

/// Pager anchors: numeric text or the usual arrow glyphs, or page-query links
fn is_pager_anchor(anchor: &Anchor) -> bool {
    let text = anchor.text.trim();
    let numeric = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());
    let glyph = matches!(text, "«" | "»" | "‹" | "›" | "..." | "…");
    let page_query = anchor
        .href
        .query()
        .map(|q| q.contains("page="))
        .unwrap_or(false);

    numeric || glyph || page_query
}
