//! plsync Engine - playlist reconciliation and action dispatch
//!
//! Provides:
//! - Additive sync of a source playlist into a target
//! - Copy-once archiving with optional recency filtering
//! - One-shot and recurring dispatch of configured actions
//!
//! ## Modules
//!
//! - [`engine`] - Fetch, map, diff and append for a single action
//! - [`dispatcher`] - Runs action lists once or on per-action timers

pub mod dispatcher;
pub mod engine;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

use plsync_core::domain::DomainError;

/// Errors that can occur while reconciling a single action
#[derive(Debug, Error)]
pub enum EngineError {
    /// A catalog call failed after the provider's own retries
    #[error("Remote error: {0:#}")]
    Remote(anyhow::Error),

    /// Fetched data could not be mapped (e.g. an entry without identity)
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl EngineError {
    /// True when the failure came from the remote catalog
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
