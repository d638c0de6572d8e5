//! Actions command - inspect the configured actions

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use plsync_core::action_file::load_actions;
use plsync_core::domain::Action;

use super::Context;

#[derive(Debug, Subcommand)]
pub enum ActionsCommand {
    /// List the actions in the action file, in run order
    List,
}

impl ActionsCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ActionsCommand::List => execute_list(ctx),
        }
    }
}

fn execute_list(ctx: &Context) -> Result<()> {
    let formatter = ctx.formatter();
    let path = ctx.actions_file(None);
    let actions = load_actions(path)?;

    if ctx.is_json() {
        let entries: Vec<_> = actions
            .iter()
            .enumerate()
            .map(|(index, action)| json!({"index": index, "action": action}))
            .collect();
        formatter.print_json(&json!({
            "file": path.display().to_string(),
            "actions": entries,
        }));
        return Ok(());
    }

    if actions.is_empty() {
        formatter.info(&format!("No actions in {}", path.display()));
        return Ok(());
    }

    formatter.info(&format!("File: {}", path.display()));
    for (index, action) in actions.iter().enumerate() {
        formatter.info(&describe(index, action));
    }
    Ok(())
}

/// One-line description, e.g. `[0] sync a -> b every 360s`
fn describe(index: usize, action: &Action) -> String {
    let mut line = format!("[{index}] {action} every {}s", action.interval_seconds());
    if let Action::Archive(archive) = action {
        if let Some(window) = archive.effective_window() {
            line.push_str(&format!(", added within {window}s"));
        }
        if !archive.avoid_duplicates {
            line.push_str(", duplicates allowed");
        }
    }
    line
}
