//! Run command - execute every configured action once
//!
//! Provides the `plsync run` CLI command which:
//! 1. Loads the action file (fails on the first invalid record)
//! 2. Builds the Spotify catalog provider from configuration and the
//!    `PLSYNC_ACCESS_TOKEN` environment variable
//! 3. Runs all actions sequentially and prints one line per action
//!
//! Exits non-zero when any action failed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use plsync_core::action_file::load_actions;
use plsync_engine::dispatcher::{ActionDispatcher, DispatchSummary};
use plsync_engine::engine::ReconciliationEngine;
use plsync_spotify::auth::EnvTokenProvider;
use plsync_spotify::provider::SpotifyCatalogProvider;

use super::Context;
use crate::output::plural;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Action file to run instead of the configured one
    #[arg(long, value_name = "FILE")]
    pub actions: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let path = ctx.actions_file(self.actions.as_deref());

        let actions = load_actions(path)?;
        info!(count = actions.len(), file = %path.display(), "Loaded actions");

        if actions.is_empty() {
            formatter.warn(&format!("No actions configured in {}", path.display()));
        }

        let credentials = Arc::new(
            EnvTokenProvider::from_env().context("No catalog access token available")?,
        );
        let provider = Arc::new(SpotifyCatalogProvider::from_config(&ctx.config, credentials)?);
        let dispatcher = ActionDispatcher::new(Arc::new(ReconciliationEngine::new(provider)));

        let summary = dispatcher.run_once(&actions).await;
        print_summary(ctx, &summary)?;

        if !summary.is_success() {
            anyhow::bail!(
                "{} of {} action{} failed",
                summary.failed,
                actions.len(),
                plural(actions.len())
            );
        }
        Ok(())
    }
}

fn print_summary(ctx: &Context, summary: &DispatchSummary) -> Result<()> {
    let formatter = ctx.formatter();

    if ctx.is_json() {
        formatter.print_json(&serde_json::to_value(summary)?);
        return Ok(());
    }

    for report in &summary.reports {
        formatter.success(&report.to_string());
    }
    for failure in &summary.failures {
        formatter.error(&format!(
            "[{}] {}: {}",
            failure.index, failure.action, failure.error
        ));
    }

    let appended: usize = summary.reports.iter().map(|r| r.appended).sum();
    formatter.info(&format!(
        "{} succeeded, {} failed, {} track{} appended",
        summary.succeeded,
        summary.failed,
        appended,
        plural(appended)
    ));
    Ok(())
}
