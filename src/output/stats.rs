//! Statistics over the stored school data
//!
//! This module provides functionality for extracting and displaying
//! statistics from the store: totals, per-country breakdowns, degree
//! coverage, and the most recent run.

use crate::records::DegreeType;
use crate::storage::{RunRecord, SchoolStore};
use crate::Result;
use std::collections::HashMap;

/// Stored-data statistics summary
#[derive(Debug, Clone)]
pub struct SchoolStatistics {
    /// Total number of stored schools
    pub total_schools: u64,

    /// School count per country ("unknown" for absent countries)
    pub by_country: HashMap<String, u64>,

    /// Sum of known exchange quotas
    pub total_quota: u64,

    /// Number of schools offering each degree type
    pub degree_breakdown: HashMap<DegreeType, u64>,

    /// Schools carrying a description (i.e. successfully enriched at least once)
    pub with_description: u64,

    /// The most recent harvest run, if any
    pub last_run: Option<RunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(SchoolStatistics)` - Successfully loaded statistics
/// * `Err(AtlasError)` - Failed to query the store
pub fn load_statistics(store: &dyn SchoolStore) -> Result<SchoolStatistics> {
    let schools = store.list_schools()?;

    let mut by_country: HashMap<String, u64> = HashMap::new();
    let mut degree_breakdown: HashMap<DegreeType, u64> = HashMap::new();
    let mut total_quota = 0u64;
    let mut with_description = 0u64;

    for school in &schools {
        let country = school
            .record
            .country
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *by_country.entry(country).or_insert(0) += 1;

        for degree in &school.record.degree_types {
            *degree_breakdown.entry(*degree).or_insert(0) += 1;
        }

        total_quota += u64::from(school.record.exchange_quota.unwrap_or(0));

        if school.record.description.is_some() {
            with_description += 1;
        }
    }

    Ok(SchoolStatistics {
        total_schools: schools.len() as u64,
        by_country,
        total_quota,
        degree_breakdown,
        with_description,
        last_run: store.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SchoolStatistics) {
    println!("=== School Store Statistics ===\n");

    println!("Overview:");
    println!("  Total schools: {}", stats.total_schools);
    println!("  Total exchange quota: {}", stats.total_quota);
    println!("  With description: {}", stats.with_description);
    println!();

    if !stats.by_country.is_empty() {
        println!("Schools by Country:");
        // Sort countries by count (descending)
        let mut country_counts: Vec<_> = stats.by_country.iter().collect();
        country_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (country, count) in country_counts {
            println!("  {}: {}", country, count);
        }
        println!();
    }

    if !stats.degree_breakdown.is_empty() {
        println!("Degree Coverage:");
        for degree in DegreeType::ALL {
            if let Some(count) = stats.degree_breakdown.get(&degree) {
                println!("  {}: {}", degree, count);
            }
        }
        println!();
    }

    match &stats.last_run {
        Some(run) => {
            println!("Last Run:");
            println!("  Started: {}", run.started_at);
            println!(
                "  Finished: {}",
                run.finished_at.as_deref().unwrap_or("(still running)")
            );
            println!("  Status: {}", run.status.to_db_string());
            println!("  Records written: {}", run.records_written);
        }
        None => println!("No harvest runs recorded yet."),
    }
}
