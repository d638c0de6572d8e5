//! plsync CLI - Command-line interface for plsync
//!
//! Provides commands for:
//! - Running every configured action once
//! - Validating an action file
//! - Listing configured actions
//! - Serving the action file over HTTP

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use plsync_core::config::{Config, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    actions::ActionsCommand, run::RunCommand, serve::ServeCommand, validate::ValidateCommand,
    Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "plsync", version, about = "Keep Spotify playlists in step")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run every configured action once
    Run(RunCommand),
    /// Check an action file for problems
    Validate(ValidateCommand),
    /// Inspect configured actions
    #[command(subcommand)]
    Actions(ActionsCommand),
    /// Serve the action file over HTTP
    Serve(ServeCommand),
}

/// An explicit `--config` must load; the default location may be absent but
/// not malformed
fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            Ok((config, path.to_path_buf()))
        }
        None => {
            let path = Config::default_path();
            let config = Config::load_or_default(&path)?;
            Ok((config, path))
        }
    }
}

/// `-v`/`-vv` raise the level, `-q` lowers it, `RUST_LOG` wins over both
fn filter_level(verbose: u8, quiet: bool, logging: &LoggingConfig) -> String {
    match (verbose, quiet) {
        (0, true) => "warn".to_string(),
        (0, false) => logging.level.clone(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_deref())?;

    let level = filter_level(cli.verbose, cli.quiet, &config.logging);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    info!(config_path = %config_path.display(), "Loaded configuration");

    let ctx = Context {
        config,
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Validate(cmd) => cmd.execute(&ctx).await,
        Commands::Actions(cmd) => cmd.execute(&ctx).await,
        Commands::Serve(cmd) => cmd.execute(&ctx).await,
    }
}
