//! Polite-Crawl main entry point
//!
//! This is the command-line interface for the Polite-Crawl pipeline.

use clap::Parser;
use polite_crawl::config::{load_config_with_hash, Config};
use polite_crawl::output::{load_store_summary, print_statistics};
use polite_crawl::pipeline::{HttpFetcher, Pipeline, PipelineDeps};
use polite_crawl::render::build_renderer;
use polite_crawl::storage::open_storage;
use polite_crawl::url::normalize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Polite-Crawl: a politeness-aware crawl pipeline
///
/// Polite-Crawl ingests URLs, honours each site's robots policy and crawl
/// delay, follows discovered links and records every page's cookies before
/// and after a reload.
#[derive(Parser, Debug)]
#[command(name = "polite-crawl")]
#[command(version)]
#[command(about = "A politeness-aware crawl pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to submit in addition to the configured seeds
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be submitted without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show store statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let submissions: Vec<String> = config
        .seeds
        .iter()
        .chain(cli.urls.iter())
        .cloned()
        .collect();

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &submissions);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_run(config, &submissions).await?;
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
            0 => EnvFilter::new("polite_crawl=info,warn"),
            1 => EnvFilter::new("polite_crawl=debug,info"),
            2 => EnvFilter::new("polite_crawl=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be submitted
fn handle_dry_run(config: &Config, submissions: &[String]) {
    println!("=== Polite-Crawl Dry Run ===\n");

    println!("Pipeline:");
    println!(
        "  Workers: {} ingest, {} crawl, {} scrape",
        config.pipeline.ingest_workers,
        config.pipeline.crawl_workers,
        config.pipeline.scrape_workers
    );
    println!("  Max attempts: {}", config.pipeline.max_attempts);
    println!("  Retry backoff: {}ms", config.pipeline.retry_backoff_ms);
    match config.pipeline.task_timeout_secs {
        Some(secs) => println!("  Task timeout: {}s", secs),
        None => println!("  Task timeout: none"),
    }
    println!("  Link routing: {:?}", config.pipeline.link_routing);

    println!("\nPoliteness:");
    println!(
        "  Default crawl delay: {}ms",
        config.politeness.default_crawl_delay_ms
    );
    println!(
        "  Max crawl delay: {}ms",
        config.politeness.max_crawl_delay_ms
    );
    println!(
        "  Crawl-delay unit: {:?}",
        config.politeness.crawl_delay_unit
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nRenderer: {:?}", config.renderer.kind);
    println!("Database: {}", config.storage.database_path);

    println!("\nSubmissions ({}):", submissions.len());
    let mut valid = 0usize;
    for raw in submissions {
        match normalize(raw) {
            Ok(url) => {
                valid += 1;
                println!("  - {} -> {}", raw, url);
            }
            Err(e) => println!("  - {} (invalid: {})", raw, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would submit {} valid URLs", valid);
}

/// Handles the --stats mode: shows store statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let summary = load_store_summary(&storage, &storage)?;
    print_statistics(None, &summary);

    Ok(())
}

/// Handles the main pipeline run
async fn handle_run(
    config: Config,
    submissions: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if submissions.is_empty() {
        tracing::warn!("No seeds configured and no URLs given; nothing to do");
    }

    let storage = Arc::new(open_storage(Path::new(&config.storage.database_path))?);
    let fetcher = HttpFetcher::from_config(
        &config.user_agent,
        Duration::from_secs(config.pipeline.fetch_timeout_secs),
    )?;
    let renderer = build_renderer(&config)?;

    let pipeline = Pipeline::start(
        &config,
        PipelineDeps {
            fetcher: Arc::new(fetcher),
            renderer,
            visited: storage.clone(),
            extracted: storage.clone(),
        },
    );

    for raw in submissions {
        if let Err(e) = pipeline.submit(raw) {
            tracing::error!("Failed to submit {}: {}", raw, e);
        }
    }

    let snapshot = pipeline.run_until_idle().await;
    tracing::info!("Pipeline finished");

    let summary = load_store_summary(storage.as_ref(), storage.as_ref())?;
    print_statistics(Some(&snapshot), &summary);

    Ok(())
}
