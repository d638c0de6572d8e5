//! Validate command - check an action file without running it
//!
//! Reports every problem with its `actions[i]` position and exits non-zero
//! when the file is invalid.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tracing::info;

use plsync_core::action_file::{load_document, validate_document};

use super::Context;
use crate::output::plural;

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Action file to check (defaults to the configured one)
    pub file: Option<PathBuf>,
}

impl ValidateCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let path = ctx.actions_file(self.file.as_deref());
        info!(file = %path.display(), "Validating action file");

        let document = load_document(path)?;
        let errors = validate_document(&document);
        let count = document
            .get("actions")
            .and_then(|a| a.as_array())
            .map_or(0, Vec::len);

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&json!({
                "valid": errors.is_empty(),
                "file": path.display().to_string(),
                "actions": count,
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success(&format!("{count} action{} valid", plural(count)));
            formatter.info(&format!("File: {}", path.display()));
        } else {
            formatter.error(&format!(
                "Action file has {} problem{}:",
                errors.len(),
                plural(errors.len())
            ));
            formatter.info(&format!("File: {}", path.display()));
            for error in &errors {
                formatter.info(&format!("  {error}"));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("{} is invalid", path.display());
        }
        Ok(())
    }
}
