//! JSON export of harvested school records

use crate::storage::SchoolStore;
use crate::Result;
use std::path::Path;

/// Exports all stored schools to a pretty-printed JSON file
///
/// # Arguments
///
/// * `store` - The store to read schools from
/// * `path` - Destination file path
///
/// # Returns
///
/// * `Ok(usize)` - Number of exported records
/// * `Err(AtlasError)` - Failed to read the store or write the file
pub fn export_json(store: &dyn SchoolStore, path: &Path) -> Result<usize> {
    let schools = store.list_schools()?;
    let records: Vec<_> = schools.iter().map(|s| &s.record).collect();

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json)?;

    tracing::info!("Exported {} schools to {}", records.len(), path.display());
    Ok(records.len())
}
