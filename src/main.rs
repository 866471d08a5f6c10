//! Exchange-Atlas main entry point
//!
//! This is the command-line interface for the Exchange-Atlas partner-school
//! harvester.

use anyhow::Context;
use clap::Parser;
use exchange_atlas::config::load_config_with_hash;
use exchange_atlas::pipeline::{run_harvest, CancelToken};
use exchange_atlas::report::print_summary;
use exchange_atlas::storage::{SchoolStore, SqliteStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exchange-Atlas: a partner-school directory harvester
///
/// Exchange-Atlas walks a paginated partner-school listing, follows each
/// school to its detail page, normalizes the merged data, and upserts it
/// into a SQLite store. Re-running a harvest is safe: records are keyed on
/// their source page URL.
#[derive(Parser, Debug)]
#[command(name = "exchange-atlas")]
#[command(version = "1.0.0")]
#[command(about = "A partner-school directory harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "export_json"])]
    dry_run: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_json"])]
    stats: bool,

    /// Export stored schools as JSON and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_json {
        handle_export_json(&config)?;
    } else {
        handle_harvest(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("exchange_atlas=info,warn"),
            1 => EnvFilter::new("exchange_atlas=debug,info"),
            2 => EnvFilter::new("exchange_atlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the planned harvest
fn handle_dry_run(config: &exchange_atlas::config::Config) {
    println!("=== Exchange-Atlas Dry Run ===\n");

    println!("Listing:");
    println!("  Base URL: {}", config.listing.base_url);
    println!("  Pages: {}", config.listing.page_count);
    println!("  Detail link pattern: {}", config.listing.detail_link_pattern);

    println!("\nHTTP:");
    println!("  Concurrency: {}", config.http.concurrency);
    println!("  Request delay: {}ms", config.http.request_delay_ms);
    println!("  Max retries: {}", config.http.max_retries);
    println!("  Retry backoff: {}ms", config.http.retry_backoff_ms);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  JSON export: {}", config.output.json_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would walk {} listing pages starting at {}",
        config.listing.page_count, config.listing.base_url
    );
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &exchange_atlas::config::Config) -> anyhow::Result<()> {
    use exchange_atlas::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let mut store = SqliteStore::new(Path::new(&config.output.database_path))?;
    store.ensure_schema()?;

    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-json mode: writes stored schools to the JSON path
fn handle_export_json(config: &exchange_atlas::config::Config) -> anyhow::Result<()> {
    use exchange_atlas::output::export_json;

    let mut store = SqliteStore::new(Path::new(&config.output.database_path))?;
    store.ensure_schema()?;

    let count = export_json(&store, Path::new(&config.output.json_path))?;
    println!("✓ Exported {} schools to {}", count, config.output.json_path);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: exchange_atlas::config::Config,
    config_hash: &str,
) -> anyhow::Result<()> {
    let cancel = CancelToken::new();

    // Ctrl-C stops issuing new fetches; in-flight work finishes and is
    // still recorded.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight fetches");
                cancel.cancel();
            }
        });
    }

    match run_harvest(config, config_hash, cancel).await {
        Ok(summary) => {
            print_summary(&summary);
            if summary.has_partial_failures() {
                tracing::warn!("Harvest completed with partial failures");
            } else {
                tracing::info!("Harvest completed cleanly");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
