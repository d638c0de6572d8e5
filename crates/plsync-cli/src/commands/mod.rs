//! CLI subcommands
//!
//! Every command receives a [`Context`] carrying the loaded configuration
//! and the selected output mode.

pub mod actions;
pub mod run;
pub mod serve;
pub mod validate;

use std::path::Path;

use plsync_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Shared state handed to every command
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// `explicit` when given, else the configured action file
    pub fn actions_file<'a>(&'a self, explicit: Option<&'a Path>) -> &'a Path {
        explicit.unwrap_or(self.config.actions.file.as_path())
    }
}

#[cfg(test)]
pub(crate) fn test_context(actions_file: &Path) -> Context {
    use plsync_core::config::ConfigBuilder;

    Context {
        config: ConfigBuilder::new().actions_file(actions_file).build(),
        format: OutputFormat::Json,
        quiet: true,
    }
}
