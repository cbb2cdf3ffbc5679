//! Price-Sweep main entry point
//!
//! This is the command-line interface for the Price-Sweep retailer tracker.

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use price_sweep::adapter::{SelectorAdapter, SiteAdapter};
use price_sweep::config::{load_config_with_hash, Config, RetailerConfig};
use price_sweep::output::{export_observations, export_path, load_statistics, print_statistics};
use price_sweep::runner::{build_http_client, run_retailer};
use price_sweep::sink::Database;
use price_sweep::source::{load_items, SourceColumns};
use price_sweep::{OutcomeKind, SweepError};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Price-Sweep: batched retailer price and stock tracking
///
/// Price-Sweep reads identifier lists, fetches each product page with a bounded retry budget,
/// extracts title, price and stock state, and persists results in fixed-size batches.
#[derive(Parser, Debug)]
#[command(name = "price-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Batched retailer price and stock tracking", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only run these retailers (repeatable); all configured retailers by default
    #[arg(short, long = "retailer", value_name = "NAME")]
    retailers: Vec<String>,

    /// Process only the first N identifiers of each retailer
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Export observations recorded on DATE (YYYY-MM-DD) to CSV and exit
    #[arg(long, value_name = "DATE", conflicts_with_all = ["dry_run", "stats"])]
    export: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let retailers = select_retailers(&config, &cli.retailers)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &retailers, cli.limit)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(date) = cli.export {
        handle_export(&config, &cli.retailers, date)
    } else {
        handle_run(&config, &config_hash, &retailers, cli.limit).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("price_sweep=info,warn"),
            1 => EnvFilter::new("price_sweep=debug,info"),
            2 => EnvFilter::new("price_sweep=trace,debug"),
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

/// Resolves `--retailer` names against the config, keeping config order
fn select_retailers<'a>(config: &'a Config, names: &[String]) -> anyhow::Result<Vec<&'a RetailerConfig>> {
    for name in names {
        if config.retailer(name).is_none() {
            return Err(SweepError::UnknownRetailer(name.clone()).into());
        }
    }

    Ok(config
        .retailers
        .iter()
        .filter(|r| names.is_empty() || names.contains(&r.name))
        .collect())
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let Some(path) = &config.output.database_path else {
        bail!("No database-path configured in [output]");
    };
    println!("Database: {}\n", path);
    Database::open(Path::new(path)).with_context(|| format!("Failed to open database {}", path))
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(
    config: &Config,
    retailers: &[&RetailerConfig],
    limit: Option<usize>,
) -> anyhow::Result<()> {
    println!("=== Price-Sweep Dry Run ===\n");

    println!("Runner Configuration:");
    println!("  Batch size: {}", config.runner.batch_size);
    println!("  Max attempts: {}", config.runner.max_attempts);
    println!("  Retry delay: {}ms", config.runner.retry_delay_ms);
    println!("  Request timeout: {}ms", config.runner.request_timeout_ms);
    println!(
        "  Batch retry pass: {}",
        if config.runner.batch_retry_pass {
            format!("on ({}ms delay)", config.runner.batch_retry_delay_ms)
        } else {
            "off".to_string()
        }
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  CSV directory: {}",
        config.output.csv_dir.as_deref().unwrap_or("(none)")
    );

    let mut failed = 0;
    println!("\nRetailers ({}):", retailers.len());
    for retailer in retailers {
        let adapter = SelectorAdapter::from_retailer(retailer)?;
        match load_items(
            Path::new(&retailer.input),
            &SourceColumns::from_retailer(retailer),
        ) {
            Ok(mut items) => {
                if let Some(limit) = limit {
                    items.truncate(limit);
                }
                let targets: Vec<_> = items
                    .iter()
                    .filter_map(|item| adapter.build_target(item))
                    .collect();
                println!(
                    "  - {}: {} identifiers, {} with a target, {} missing",
                    retailer.name,
                    items.len(),
                    targets.len(),
                    items.len() - targets.len()
                );
                for url in targets.iter().take(3) {
                    println!("    * {}", url);
                }
            }
            Err(e) => {
                failed += 1;
                println!("  - {}: cannot load {}: {}", retailer.name, retailer.input, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} identifier source(s) could not be loaded", failed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let stats = load_statistics(&db)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --export mode: writes one day's observations to CSV
fn handle_export(config: &Config, retailers: &[String], date: NaiveDate) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let dir = config.output.csv_dir.as_deref().unwrap_or(".");
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir))?;
    let path = export_path(Path::new(dir), date);

    let written = export_observations(&db, date, retailers, &path)?;
    if written == 0 {
        println!("No observations found for {}", date);
    } else {
        println!("✓ Exported {} observations to: {}", written, path.display());
    }
    Ok(())
}

/// Handles the main run: every selected retailer once, one after another
async fn handle_run(
    config: &Config,
    config_hash: &str,
    retailers: &[&RetailerConfig],
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let client = build_http_client(&config.user_agent, &config.runner)
        .context("Failed to build HTTP client")?;

    tracing::info!(
        "Starting sweep of {} retailer(s) at {}",
        retailers.len(),
        Utc::now().to_rfc3339()
    );

    let mut failed = Vec::new();
    for retailer in retailers {
        match run_retailer(config, config_hash, retailer, &client, limit).await {
            Ok(summary) => {
                let state = &summary.state;
                tracing::info!(
                    "[{}] {} success, {} not found, {} failed, {} missing target",
                    retailer.name,
                    state.count(OutcomeKind::Success),
                    state.count(OutcomeKind::NotFound),
                    state.count(OutcomeKind::TransientFailure),
                    state.count(OutcomeKind::MissingTarget)
                );
            }
            Err(e) => {
                tracing::error!("[{}] Run failed: {}", retailer.name, e);
                failed.push(retailer.name.as_str());
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} retailer run(s) failed: {}", failed.len(), failed.join(", "));
    }

    tracing::info!("Sweep completed successfully");
    Ok(())
}
