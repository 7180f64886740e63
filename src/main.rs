//! Driftwatch main entry point
//!
//! This is the command-line interface for the Driftwatch change monitor.

use anyhow::Context;
use clap::Parser;
use driftwatch::config::{load_config_with_hash, Config};
use driftwatch::crawler::{build_loader, crawl, CrawlConfig, ScrollSettings};
use driftwatch::output::{generate_change_report, load_statistics, print_statistics};
use driftwatch::storage::open_storage;
use driftwatch::watch::{build_jobs, run_watch, JobRole};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Driftwatch: watches websites for content changes
///
/// Driftwatch crawls each configured target within its own host, extracts
/// the visible text of every page, and reports unified diffs against the
/// snapshots stored by the previous run.
#[derive(Parser, Debug)]
#[command(name = "driftwatch")]
#[command(version)]
#[command(about = "Crawls websites and reports content changes", long_about = None)]
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

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "crawl"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "crawl"])]
    stats: bool,

    /// Crawl a single URL with the configured crawler settings and print the
    /// extracted text of every page; nothing is stored
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats"])]
    crawl: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(url) = &cli.crawl {
        handle_single_crawl(&config, url).await
    } else {
        handle_watch(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftwatch=info,warn"),
            1 => EnvFilter::new("driftwatch=debug,info"),
            2 => EnvFilter::new("driftwatch=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the planned jobs
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Driftwatch Dry Run ===\n");

    let scroll = ScrollSettings::from_config(&config.crawler);

    println!("Crawler Configuration:");
    println!("  Max pages per target: {}", config.crawler.max_pages);
    println!(
        "  Max pages per tracking URL: {}",
        config.crawler.tracking_max_pages
    );
    println!("  Scroll policy: {:?}", scroll.policy);
    println!("  Scroll settle: {}ms", config.crawler.scroll_settle_ms);
    println!(
        "  Max scroll iterations: {}",
        config.crawler.max_scroll_iterations
    );
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);
    println!(
        "  Concurrent crawls: {}",
        config.crawler.max_concurrent_crawls
    );
    println!("  Loader: {:?}", config.crawler.loader);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Report: {}", config.output.report_path);
    println!("  First sighting: {:?}", config.changes.first_sighting);

    let jobs = build_jobs(config)?;
    println!("\nCrawl Jobs ({}):", jobs.len());
    for job in &jobs {
        let role = match job.role {
            JobRole::Main => "main",
            JobRole::Tracking => "tracking",
        };
        println!(
            "  - [{}] {} {} (max {} pages, scope {}, scroll {:?})",
            job.target,
            role,
            job.crawl.start_url(),
            job.crawl.max_pages(),
            job.crawl.scope_host(),
            job.crawl.scroll().policy
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would watch {} targets with {} crawl jobs",
        config.targets.len(),
        jobs.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --crawl mode: one ad-hoc crawl, printed and discarded
async fn handle_single_crawl(config: &Config, url: &str) -> anyhow::Result<()> {
    let crawl_config = CrawlConfig::new(url, config.crawler.max_pages)
        .with_context(|| format!("Invalid start URL {}", url))?
        .with_scroll(ScrollSettings::from_config(&config.crawler));

    let output = crawl(&crawl_config, &config.crawler, &config.user_agent).await?;

    let mut urls: Vec<_> = output.text_map().into_iter().collect();
    urls.sort();

    println!("=== Crawl of {} ===\n", output.start_url);
    for (url, text) in &urls {
        println!("{}", url);
        println!("  {}\n", text);
    }

    for failure in &output.failures {
        println!("✗ {}: {}", failure.url, failure.error);
    }

    println!(
        "\n{} pages crawled, {} failed",
        output.pages.len(),
        output.failures.len()
    );

    Ok(())
}

/// Handles the default mode: a full watch run
async fn handle_watch(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!("Watching {} targets", config.targets.len());

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let storage = Arc::new(Mutex::new(storage));
    let loader = build_loader(&config.crawler, &config.user_agent).await?;

    let result = run_watch(config, config_hash, loader.clone(), storage).await;
    loader.shutdown().await;
    let report = result?;

    let report_path = Path::new(&config.output.report_path);
    generate_change_report(&report, config_hash, report_path)?;

    println!(
        "✓ Run {}: {} pages crawled, {} changes",
        report.run_id,
        report.total_pages(),
        report.total_changes()
    );
    println!("✓ Report written to: {}", report_path.display());

    Ok(())
}
