//! Serve command - HTTP surface for editing the action file
//!
//! Runs until Ctrl+C. Changes are written straight to the action file; a
//! running `plsyncd` picks them up on its next restart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use plsync_web::{ActionStore, ActionsServer};

use super::Context;

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Listen address (defaults to `server.addr`)
    #[arg(long)]
    pub addr: Option<String>,

    /// Action file to serve instead of the configured one
    #[arg(long, value_name = "FILE")]
    pub actions: Option<PathBuf>,
}

impl ServeCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let addr = self.addr.as_deref().unwrap_or(ctx.config.server.addr.as_str());
        let path = ctx.actions_file(self.actions.as_deref());

        let store = Arc::new(ActionStore::new(path));
        let server = ActionsServer::new(store, addr)?;

        formatter.success(&format!("Serving {} on http://{}", path.display(), server.addr()));

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received SIGINT (Ctrl+C)");
                    signal_token.cancel();
                }
                Err(e) => error!(error = %e, "Failed to install Ctrl+C handler"),
            }
        });

        server.run(shutdown).await
    }
}
