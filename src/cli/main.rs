//! Wallpaper mirror CLI
//!
//! Command-line interface that mirrors the wallpaper catalog into a local
//! directory tree.

use super::config::CliConfigBuilder;
use crate::{
    mirror::MirrorEngine,
    services::ConsoleStatusReporter,
    tracing_config::{init_cli_tracing, spans},
    types::MirrorStats,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{debug, Instrument};

/// Mirror the wallpaper catalog to disk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "wallpaper-mirror")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Catalog backend
    #[arg(short, long, value_enum, default_value_t = CliServer::Prod)]
    pub server: CliServer,

    /// Language/region code sent with catalog requests
    #[arg(short, long, default_value = crate::config::DEFAULT_REGION)]
    pub region: String,

    /// List collections and images, download nothing
    #[arg(short, long)]
    pub list_only: bool,

    /// Omit the default filter labels
    #[arg(short, long)]
    pub unfiltered: bool,

    /// Additional filter label (repeatable)
    #[arg(short, long = "filter", value_name = "LABEL")]
    pub filters: Vec<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short = 'v', long = "debug", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Root directory receiving one subdirectory per collection
    #[arg(short, long, value_name = "DIR", default_value = crate::config::DEFAULT_OUTPUT_ROOT)]
    pub output: String,

    /// Timeout in seconds for catalog requests, probes and downloads
    #[arg(short, long, value_name = "SECS", default_value_t = crate::config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Also require a matching `.sha256` sidecar before trusting a local file
    #[arg(long)]
    pub verify_checksums: bool,

    /// Show byte progress while an image downloads
    #[arg(long)]
    pub progress: bool,

    /// Print the run totals as JSON when finished
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliServer {
    Prod,
    Staging,
    Test,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid command-line arguments")?;
    debug!(config = ?config, "Configuration resolved");

    let span = spans::session(&session_id, &config.server.to_string(), &config.region);

    let engine = MirrorEngine::from_config(config)
        .context("Failed to set up mirror")?
        .with_reporter(Arc::new(ConsoleStatusReporter::new(cli.json)));

    let stats = engine
        .run()
        .instrument(span)
        .await
        .context("Mirror run aborted")?;

    if cli.json {
        print_json_summary(&stats)?;
    }

    Ok(())
}

fn print_json_summary(stats: &MirrorStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("Failed to serialize run totals")?;
    println!("{}", json);
    Ok(())
}
