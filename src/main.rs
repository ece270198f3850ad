//! filetomb - destroy files, keep their remnants.
//!
//! Drop files or folders onto the executable (or pass them as arguments).
//! Each one is deleted bottom-up and a few sampled bytes of every destroyed
//! object are appended to a pixel-encoded log image.

use anyhow::Context;
use clap::Parser;
use filetomb::config::DEFAULT_RAW_LOG_NAME;
use filetomb::{BurialReport, PixelLog, Tomb, TombConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filetomb")]
#[command(author, version)]
#[command(
    about = "Destroy files and directories, burying a sampled remnant of each in a PNG log",
    long_about = "Deletes every given path bottom-up. Before each object is removed a few random bytes are sampled from it and appended to an append-only log stored in the pixels of a square PNG image."
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Files or directories to destroy
    #[arg(required_unless_present = "inspect")]
    paths: Vec<PathBuf>,

    /// Pixel log image (default: image.png)
    #[arg(long)]
    image: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also append raw remnant bytes to a file (default: log.txt)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = DEFAULT_RAW_LOG_NAME)]
    raw_log: Option<PathBuf>,

    /// Bytes sampled from each destroyed object (default: 4)
    #[arg(long)]
    sample_size: Option<usize>,

    /// Sample files up to this size together with their path
    #[arg(long)]
    small_file_threshold: Option<u64>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Drop remnants of objects that could not be removed
    #[arg(long)]
    strict: bool,

    /// Print the log contents and exit without deleting anything
    #[arg(long, conflicts_with = "paths")]
    inspect: bool,

    /// Print the burial report as JSON
    #[arg(long)]
    json: bool,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Diagnostic level written to stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;

    if cli.inspect {
        return cmd_inspect(&config);
    }

    let mut tomb = Tomb::from_config(&config)
        .with_context(|| format!("opening log {}", config.image_path.display()))?;
    let report = tomb.bury(&cli.paths)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<TombConfig> {
    let mut config = match &cli.config {
        Some(path) => TombConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TombConfig::default(),
    };

    if let Some(image) = &cli.image {
        config.image_path = image.clone();
    }
    if let Some(raw_log) = &cli.raw_log {
        config.raw_log = Some(raw_log.clone());
    }
    if let Some(sample_size) = cli.sample_size {
        config.sample_size = sample_size;
    }
    if cli.small_file_threshold.is_some() {
        config.small_file_threshold = cli.small_file_threshold;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.strict {
        config.record_failed = false;
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &BurialReport) {
    println!("Buried {} object(s)", report.removed);
    println!("  Entries appended: {}", report.entries_appended);
    println!("  Log cursor:       {}", report.cursor);
    println!("  Log side:         {}", report.side);

    if !report.failed.is_empty() {
        println!();
        println!("Left behind ({}):", report.failed.len());
        for failed in &report.failed {
            println!("  {} ({})", failed.path.display(), failed.reason);
        }
    }
}

fn cmd_inspect(config: &TombConfig) -> anyhow::Result<()> {
    let log = PixelLog::open(&config.image_path)
        .with_context(|| format!("opening log {}", config.image_path.display()))?;

    println!("Pixel Log");
    println!("=========");
    println!("Image:     {}", log.path().display());
    println!("Side:      {}", log.side());
    println!("Capacity:  {}", log.capacity());
    println!("Cursor:    {}", log.cursor());

    if !log.is_empty() {
        println!();
        for (index, entry) in log.entries().enumerate() {
            println!("{:>8}  {}", index, entry);
        }
    }

    Ok(())
}
