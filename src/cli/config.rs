//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliServer};
use crate::config::{FreshnessPolicy, MirrorConfig, Server};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `MirrorConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `MirrorConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<MirrorConfig> {
        let freshness = if cli.verify_checksums {
            FreshnessPolicy::SizeAndChecksum
        } else {
            FreshnessPolicy::SizeOnly
        };

        let mut builder = MirrorConfig::builder()
            .server(Self::server(cli.server))
            .region(cli.region.clone())
            .unfiltered(cli.unfiltered)
            .output_root(&cli.output)
            .timeout_secs(cli.timeout)
            .list_only(cli.list_only)
            .freshness(freshness)
            .show_progress(cli.progress);

        for label in &cli.filters {
            builder = builder.filter(label.clone());
        }

        builder.build().context("Invalid mirror configuration")
    }

    fn server(server: CliServer) -> Server {
        match server {
            CliServer::Prod => Server::Production,
            CliServer::Staging => Server::Staging,
            CliServer::Test => Server::Test,
        }
    }
}
