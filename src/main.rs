//! Luma-Events main entry point
//!
//! This is the command-line interface for the lu.ma event extraction engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use luma_events::config::{load_config_with_hash, Config};
use luma_events::event::{BatchRequest, BatchRun, PageShape, SourceDescriptor};
use luma_events::output::{self, generate_markdown_summary, print_statistics, stats_with_keywords};
use luma_events::{Coordinator, ExportFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Luma-Events: extract event listings from lu.ma
///
/// Fetches explore, city and event pages, turns them into normalized event
/// records, and reports statistics or exports them as JSON or CSV.
#[derive(Parser, Debug)]
#[command(name = "luma-events")]
#[command(version)]
#[command(about = "Extract event listings from lu.ma", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where scrape results go
#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: ExportFormat,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the explore feed
    Explore {
        /// Keep only events matching at least one keyword
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Scrape a single event by its slug
    Slug {
        slug: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Scrape a city listing
    City {
        city: String,

        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Scrape an arbitrary page URL
    Url {
        url: String,

        /// Treat the page as a listing of events
        #[arg(long)]
        listing: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Run a JSON batch request: {"sources": [...], "keywords": [...]}
    Batch {
        #[arg(value_name = "REQUEST")]
        request: PathBuf,

        /// Write the full batch run (entries and errors) instead of records
        #[arg(long)]
        entries: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Print statistics for a JSON record set
    Stats {
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Write a markdown summary to this file
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,
    },

    /// Convert a JSON record set to another format
    Export {
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Explore { keywords, out } => {
            scrape(config, SourceDescriptor::explore(keywords), &out).await
        }
        Command::Slug { slug, out } => {
            scrape(config, SourceDescriptor::custom_slug(slug), &out).await
        }
        Command::City {
            city,
            keywords,
            out,
        } => {
            let descriptor = SourceDescriptor::city(city).with_keywords(keywords);
            scrape(config, descriptor, &out).await
        }
        Command::Url { url, listing, out } => {
            let shape = if listing {
                PageShape::Listing
            } else {
                PageShape::Single
            };
            scrape(config, SourceDescriptor::generic(url, shape), &out).await
        }
        Command::Batch {
            request,
            entries,
            out,
        } => handle_batch(config, &request, entries, &out).await,
        Command::Stats {
            records,
            keywords,
            markdown,
        } => handle_stats(&records, &keywords, markdown.as_deref()),
        Command::Export { records, out } => {
            let records = read_records(&records)?;
            write_output(&output::serialize(&records, out.format)?, &out)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("luma_events=info,warn"),
            1 => EnvFilter::new("luma_events=debug,info"),
            2 => EnvFilter::new("luma_events=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays clean for exported records
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

async fn scrape(config: Config, descriptor: SourceDescriptor, out: &OutputArgs) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?;
    let entry = coordinator.run_one(descriptor).await;

    if let Some(error) = &entry.error {
        if entry.records.is_empty() {
            bail!("{} failed: {}", entry.descriptor, error);
        }
        tracing::warn!("{} partially failed: {}", entry.descriptor, error);
    }

    write_output(&output::serialize(&entry.records, out.format)?, out)
}

async fn handle_batch(
    config: Config,
    request_path: &Path,
    entries: bool,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    let raw = std::fs::read(request_path)
        .with_context(|| format!("failed to read {}", request_path.display()))?;
    let request: BatchRequest = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid batch request in {}", request_path.display()))?;

    let coordinator = Coordinator::new(config)?;
    let run = coordinator.run(request.into_descriptors()).await;
    report_failures(&run);

    let content = if entries {
        if out.format != ExportFormat::Json {
            bail!("--entries is only available with --format json");
        }
        serde_json::to_vec_pretty(&run)?
    } else {
        output::serialize(&run.into_records(), out.format)?
    };

    write_output(&content, out)
}

fn report_failures(run: &BatchRun) {
    for (index, entry) in run.entries.iter().enumerate() {
        if let Some(error) = &entry.error {
            tracing::warn!("Entry {} ({}): {}", index, entry.descriptor, error);
        }
    }
}

fn handle_stats(records: &Path, keywords: &[String], markdown: Option<&Path>) -> anyhow::Result<()> {
    let records = read_records(records)?;
    let summary = stats_with_keywords(&records, keywords);

    print_statistics(&summary);

    if let Some(path) = markdown {
        generate_markdown_summary(&summary, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Markdown summary written to {}", path.display());
    }

    Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<luma_events::EventRecord>> {
    let records = output::read_records(path)
        .with_context(|| format!("failed to load records from {}", path.display()))?;
    tracing::info!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn write_output(content: &[u8], out: &OutputArgs) -> anyhow::Result<()> {
    match &out.output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote {} output to {}", out.format, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
