//! CrawlDocs main entry point
//!
//! This is the command-line interface for the CrawlDocs documentation crawler.

use anyhow::{bail, Context};
use clap::Parser;
use crawldocs::config::{load_config_with_hash, validate, Config};
use crawldocs::crawler::{crawl, CrawlSession};
use crawldocs::manifest::manifest_path;
use crawldocs::output::{default_output_dir, generate_report, print_report, write_markdown_report, SessionReport};
use crawldocs::resume::ResumeOverrides;
use crawldocs::{normalize_url, SessionStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// CrawlDocs: a resumable documentation crawler
///
/// CrawlDocs crawls a single website, saves every page as a cleaned text
/// document and skips duplicate and near-empty pages. Progress is kept in a
/// manifest so an interrupted crawl can be resumed.
#[derive(Parser, Debug)]
#[command(name = "crawldocs")]
#[command(version)]
#[command(about = "A resumable documentation crawler", long_about = None)]
struct Cli {
    /// Base URL to crawl
    #[arg(short, long)]
    url: Option<String>,

    /// Output directory (default: derived from the URL's host)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum pages to save (0 = unlimited)
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,

    /// Requests per second (0 = unlimited)
    #[arg(short, long)]
    rate_limit: Option<u32>,

    /// Concurrent fetches
    #[arg(short, long)]
    workers: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume the interrupted session in the output directory
    #[arg(long, conflicts_with = "report")]
    resume: bool,

    /// Print the report for the session in the output directory and exit
    #[arg(long)]
    report: bool,

    /// Also write the report as markdown to this file
    #[arg(long, value_name = "FILE", requires = "report")]
    markdown: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    // Command line flags win over the file
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(rate_limit) = cli.rate_limit {
        config.crawler.rate_limit = rate_limit;
    }
    if let Some(workers) = cli.workers {
        config.crawler.parallelism = workers;
    }
    validate(&config).context("invalid settings")?;

    if cli.report {
        let output_dir = resolve_output_dir(&cli, &config)?;
        return handle_report(&output_dir, cli.markdown.as_deref());
    }

    let session = if cli.resume {
        let output_dir = resolve_output_dir(&cli, &config)?;
        let overrides = ResumeOverrides {
            max_pages: cli.max_pages,
            parallelism: cli.workers,
            rate_limit: cli.rate_limit,
            config_hash,
        };
        CrawlSession::resume(&output_dir, &config, &overrides)
            .with_context(|| format!("cannot resume session in {}", output_dir.display()))?
    } else {
        let Some(url) = cli.url.as_deref() else {
            bail!("--url is required unless --resume or --report is given");
        };
        let base_url = normalize_url(url).with_context(|| format!("invalid base URL {}", url))?;
        let output_dir = resolve_output_dir(&cli, &config)?;

        if manifest_path(&output_dir).exists() {
            tracing::warn!(
                "Replacing the session in {}; use --resume to continue it instead",
                output_dir.display()
            );
        }

        CrawlSession::start(&base_url, &output_dir, &config, config_hash)
            .context("failed to start session")?
    };

    handle_crawl(Arc::new(session)).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawldocs=info,warn"),
            1 => EnvFilter::new("crawldocs=debug,info"),
            2 => EnvFilter::new("crawldocs=trace,debug"),
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

/// Picks the output directory: `--output`, then the config file, then the URL's host
fn resolve_output_dir(cli: &Cli, config: &Config) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.output {
        return Ok(dir.clone());
    }
    if let Some(dir) = &config.output.directory {
        return Ok(PathBuf::from(dir));
    }
    match cli.url.as_deref() {
        Some(url) => {
            let base_url = normalize_url(url).with_context(|| format!("invalid base URL {}", url))?;
            Ok(PathBuf::from(default_output_dir(&base_url)))
        }
        None => bail!("--output or --url is required to locate the session"),
    }
}

/// Handles the --report mode: prints the report of a saved session
fn handle_report(output_dir: &Path, markdown: Option<&Path>) -> anyhow::Result<()> {
    let report = generate_report(output_dir)
        .with_context(|| format!("no readable session in {}", output_dir.display()))?;
    print_report(&report);
    write_markdown(&report, markdown)
}

/// Handles the main crawl operation
async fn handle_crawl(session: Arc<CrawlSession>) -> anyhow::Result<()> {
    tracing::info!(
        "Output directory: {} (max pages: {}, workers: {}, rate limit: {}/s)",
        session.output_dir().display(),
        session.crawler_config().max_pages,
        session.crawler_config().parallelism,
        session.crawler_config().rate_limit
    );

    // First Ctrl-C stops new work; in-flight pages finish and the session is saved
    let stop_session = Arc::clone(&session);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_session.request_stop();
        }
    });

    let report = match crawl(Arc::clone(&session)).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report);
    if report.status == SessionStatus::Interrupted {
        println!(
            "Session interrupted. Continue with: crawldocs --resume --output {}",
            session.output_dir().display()
        );
    }

    Ok(())
}

fn write_markdown(report: &SessionReport, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        write_markdown_report(report, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }
    Ok(())
}
