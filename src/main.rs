//! Ripple-Fetch main entry point
//!
//! This is the command-line interface for the Ripple-Fetch image harvester.

use clap::Parser;
use ripple_fetch::config::{load_config_with_hash, validate, Config, FailurePolicy};
use ripple_fetch::Pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ripple-Fetch: a bounded, retrying image harvester
///
/// Ripple-Fetch fetches a page, collects every image it references, and
/// downloads them concurrently. Timed-out downloads are retried with
/// exponential backoff; other failures end the run.
#[derive(Parser, Debug)]
#[command(name = "ripple-fetch")]
#[command(version)]
#[command(about = "A bounded, retrying image harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the page URL from the configuration
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Override the destination directory from the configuration
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Override the maximum number of concurrent downloads
    #[arg(long, value_name = "N")]
    max_concurrency: Option<u32>,

    /// Let every download finish even after one fails
    #[arg(long)]
    collect_all: bool,

    /// Validate config and list the image references without downloading
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid command-line override: {}", e);
        return Err(e.into());
    }

    let pipeline = Pipeline::new(config)?;

    if cli.dry_run {
        handle_dry_run(&pipeline).await?;
    } else {
        handle_run(pipeline).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_fetch=info,warn"),
            1 => EnvFilter::new("ripple_fetch=debug,info"),
            2 => EnvFilter::new("ripple_fetch=trace,debug"),
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

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.url {
        config.source.page_url = url.clone();
    }
    if let Some(dest) = &cli.dest {
        config.source.destination_dir = dest.clone();
    }
    if let Some(n) = cli.max_concurrency {
        config.pool.max_concurrency = n;
    }
    if cli.collect_all {
        config.pool.failure_policy = FailurePolicy::CollectAll;
    }
}

/// Handles the --dry-run mode: shows the configuration and what would be downloaded
async fn handle_dry_run(pipeline: &Pipeline) -> Result<(), Box<dyn std::error::Error>> {
    let config = pipeline.config();
    println!("=== Ripple-Fetch Dry Run ===\n");

    println!("Source:");
    println!("  Page: {}", config.source.page_url);
    println!("  Destination: {}", config.source.destination_dir.display());

    println!("\nPool:");
    println!("  Max concurrency: {}", config.pool.max_concurrency);
    println!("  Failure policy: {:?}", config.pool.failure_policy);
    println!("  Progress interval: {}ms", config.pool.progress_interval_ms);

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!(
        "  Interval: {}ms .. {}ms (jitter {})",
        config.retry.min_interval_ms, config.retry.max_interval_ms, config.retry.jitter_factor
    );
    println!("  Attempt timeout: {}ms", config.attempt.timeout_ms);

    let references = pipeline.references().await?;
    println!("\nImage references ({}):", references.len());
    for reference in &references {
        println!("  - {}", reference);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main download run
async fn handle_run(pipeline: Pipeline) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling downloads");
            shutdown.cancel();
        }
    });

    let report = match pipeline.run_report().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    for failure in report.failures() {
        eprintln!("✗ {}: {}", failure.label, failure.outcome);
    }

    match report.into_result() {
        Ok(stats) => {
            tracing::info!(
                "Downloaded {} images (peak {} in flight)",
                stats.succeeded,
                stats.peak_in_flight
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
