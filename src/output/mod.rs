//! Output module for exported data and stored-data statistics
//!
//! This module handles:
//! - Exporting harvested records as JSON
//! - Loading and printing statistics over the stored data

mod json;
pub mod stats;

pub use json::export_json;
pub use stats::{load_statistics, print_statistics, SchoolStatistics};
