//! DGES harvester main entry point
//!
//! This is the command-line interface for the DGES placement registry
//! harvester.

use clap::Parser;
use dges_harvester::config::load_config_with_hash;
use dges_harvester::filter::UniversalFilter;
use dges_harvester::harvester::harvest;
use dges_harvester::types::Contest;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// dges-harvester: an incremental DGES placement registry crawler
///
/// Harvests higher-education placement lists (schools, courses and
/// candidates) from the DGES registry into a resumable local snapshot.
/// Runs are incremental: anything the snapshot already holds is never
/// fetched again.
#[derive(Parser, Debug)]
#[command(name = "dges-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An incremental DGES placement registry crawler", long_about = None)]
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
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the snapshot and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Handle different modes
    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        return handle_harvest(&config).await;
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dges_harvester=info,warn"),
            1 => EnvFilter::new("dges_harvester=debug,info"),
            2 => EnvFilter::new("dges_harvester=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be
/// harvested
fn handle_dry_run(
    config: &dges_harvester::config::Config,
) -> Result<(), dges_harvester::HarvestError> {
    println!("=== Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Workers: {}", config.harvest.workers);
    println!("  Fetch timeout: {}s", config.harvest.fetch_timeout);
    println!("  Base URL: {}", config.harvest.base_url);

    println!("\nSnapshot:");
    match config.cache.snapshot_path() {
        Some(path) => println!("  Path: {}", path.display()),
        None => println!("  Disabled (no snapshot-path configured)"),
    }

    let phases = config.contests.phases();
    println!("\nContests ({} years):", config.contests.years.len());
    for &year in &config.contests.years {
        for &phase in &phases {
            println!("  - {}", Contest::new(year, phase));
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest {} contests",
        config.contests.years.len() * phases.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the snapshot
fn handle_stats(
    config: &dges_harvester::config::Config,
) -> Result<(), dges_harvester::HarvestError> {
    use dges_harvester::output::{load_statistics, print_statistics};
    use dges_harvester::store::Store;

    match config.cache.snapshot_path() {
        Some(path) => println!("Snapshot: {}\n", path.display()),
        None => println!("Snapshot: disabled\n"),
    }

    let store = Store::from_cache(config.cache.snapshot_path())?;
    let stats = load_statistics(&store);
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &dges_harvester::config::Config) -> ExitCode {
    tracing::info!(
        "Starting harvest: {} years, {} workers",
        config.contests.years.len(),
        config.harvest.workers
    );

    let filter = UniversalFilter::for_years_and_phases(
        config.contests.years.clone(),
        config.contests.phases(),
    );
    match harvest(config, &filter).await {
        Ok(report) => {
            dges_harvester::output::print_report(&report);
            if report.interrupted {
                // Conventional exit status for a SIGINT-terminated process
                ExitCode::from(130)
            } else {
                tracing::info!("Harvest completed successfully");
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
