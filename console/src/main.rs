//! BirdIA console – identify bird calls, browse your sightings and
//! administer the platform from the terminal.

mod app;
mod cli;
mod commands;
mod prompt;
mod router;
mod shell;
mod signal;
mod views;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use birdia_common::config;

use crate::app::App;
use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // ── load config ──────────────────────────────────────────────────
    let config_path = config::resolve_path(cli.config.as_deref());
    let mut config = config::load_or_default(&config_path).context("Config load failed")?;
    if let Some(url) = cli.api_url.as_deref() {
        config.api_url = config::normalize_url(url);
    }
    debug!("API at {}, session at {}", config.api_url, config.session_path.display());

    // ── ctrl-c ───────────────────────────────────────────────────────
    signal::install()?;

    let mut app = App::new(config, cli.open_image)?;
    match cli.command {
        Commands::Shell => shell::run(&mut app).await,
        command => commands::run(&mut app, command).await,
    }
}
