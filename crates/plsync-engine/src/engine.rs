//! Reconciliation engine
//!
//! The [`ReconciliationEngine`] executes one configured action against the
//! remote catalog through the [`ICatalogProvider`] port.
//!
//! ## Sync (additive)
//!
//! 1. Fetch source and target concurrently
//! 2. Map both to identity sets
//! 3. Append `source - target` to the target, in source order
//!
//! ## Archive (copy-once)
//!
//! 1. Fetch the source, optionally keeping only recently added entries
//! 2. Resolve the destination: explicit target, else a playlist named
//!    `"<source name>-Archive"`, created on first use
//! 3. Subtract what the destination already holds (when `avoid_duplicates`)
//! 4. Append the rest
//!
//! Neither flow removes or reorders anything. Both are idempotent: running
//! an action twice with no external change appends nothing the second time.
//!
//! ## Failures
//!
//! The provider retries transient failures of individual requests. Any error
//! that reaches the engine aborts the action; an append that fails midway is
//! neither retried nor rolled back, and the next run appends what is missing.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use plsync_core::domain::{
    Action, ActionKind, ArchiveAction, PlaylistEntry, PlaylistId, SyncAction, TrackId,
};
use plsync_core::mapper::{filter_by_recency, to_identity_set, IdentitySet};
use plsync_core::ports::ICatalogProvider;

use crate::EngineError;

/// Suffix of playlists created to hold archived tracks
pub const ARCHIVE_SUFFIX: &str = "-Archive";

/// Archive playlists created by name are private
const ARCHIVE_PUBLIC: bool = false;

/// Name of the archive playlist for a source playlist called `source_name`
pub fn archive_name(source_name: &str) -> String {
    format!("{source_name}{ARCHIVE_SUFFIX}")
}

// ============================================================================
// ReconcileReport
// ============================================================================

/// Summary of one completed reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub action_kind: ActionKind,
    pub source: PlaylistId,
    /// Playlist that received (or would have received) the appends
    pub destination: PlaylistId,
    /// Entries read from the source, before any recency filter
    pub fetched: usize,
    pub appended: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}: {} appended ({} fetched) in {}ms",
            self.action_kind,
            self.source,
            self.destination,
            self.appended,
            self.fetched,
            self.duration_ms
        )
    }
}

// ============================================================================
// ReconciliationEngine
// ============================================================================

/// Executes sync and archive actions against the catalog
pub struct ReconciliationEngine {
    provider: Arc<dyn ICatalogProvider>,
}

impl ReconciliationEngine {
    /// Creates an engine that reads and writes through `provider`
    pub fn new(provider: Arc<dyn ICatalogProvider>) -> Self {
        Self { provider }
    }

    /// Runs one action of either kind
    ///
    /// # Errors
    /// See [`sync`](Self::sync) and [`archive`](Self::archive)
    pub async fn run(&self, action: &Action) -> Result<ReconcileReport, EngineError> {
        match action {
            Action::Sync(sync) => self.sync(sync).await,
            Action::Archive(archive) => self.archive(archive).await,
        }
    }

    /// Makes the target contain every track of the source
    ///
    /// The target set is always subtracted: sync is additive reconciliation,
    /// so `avoid_duplicates` has no effect here.
    ///
    /// # Returns
    /// A [`ReconcileReport`] with `appended = 0` when the target was already
    /// up to date
    ///
    /// # Errors
    /// - [`EngineError::Remote`] if either fetch or the append fails
    /// - [`EngineError::Domain`] if a fetched entry has no track identity
    #[tracing::instrument(
        skip(self, action),
        fields(source = %action.source_playlist_id, target = %action.target_playlist_id)
    )]
    pub async fn sync(&self, action: &SyncAction) -> Result<ReconcileReport, EngineError> {
        let start = Instant::now();
        let source = &action.source_playlist_id;
        let target = &action.target_playlist_id;

        let (source_entries, target_entries) =
            tokio::try_join!(self.fetch(source), self.fetch(target))?;

        let source_set = to_identity_set(&source_entries)?;
        let target_set = to_identity_set(&target_entries)?;
        let to_add = source_set.difference(&target_set);

        debug!(
            source_items = source_set.len(),
            target_items = target_set.len(),
            missing = to_add.len(),
            "Computed sync delta"
        );

        let appended = self.append(target, to_add).await?;

        Ok(ReconcileReport {
            action_kind: ActionKind::Sync,
            source: source.clone(),
            destination: target.clone(),
            fetched: source_entries.len(),
            appended,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Copies source tracks into the archive destination, at most once each
    ///
    /// # Errors
    /// - [`EngineError::Remote`] if a fetch, the destination lookup/creation
    ///   or the append fails
    /// - [`EngineError::Domain`] if a considered entry has no track identity
    #[tracing::instrument(skip(self, action), fields(source = %action.source_playlist_id))]
    pub async fn archive(&self, action: &ArchiveAction) -> Result<ReconcileReport, EngineError> {
        let start = Instant::now();
        let source = &action.source_playlist_id;

        let fetched = self.fetch(source).await?;
        let fetched_count = fetched.len();

        let candidates = match action.effective_window() {
            Some(window) => {
                let recent = filter_by_recency(&fetched, window);
                debug!(
                    window_secs = window,
                    kept = recent.len(),
                    dropped = fetched_count - recent.len(),
                    "Applied recency filter"
                );
                recent
            }
            None => fetched,
        };
        let candidate_set = to_identity_set(&candidates)?;

        let destination = self.resolve_destination(action).await?;

        let to_add = if action.avoid_duplicates {
            let existing = to_identity_set(&self.fetch(&destination).await?)?;
            candidate_set.difference(&existing)
        } else {
            candidate_set
        };

        let appended = self.append(&destination, to_add).await?;

        Ok(ReconcileReport {
            action_kind: ActionKind::Archive,
            source: source.clone(),
            destination,
            fetched: fetched_count,
            appended,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Explicit target, or the source's `-Archive` playlist looked up by name
    async fn resolve_destination(&self, action: &ArchiveAction) -> Result<PlaylistId, EngineError> {
        if let Some(target) = &action.target_playlist_id {
            return Ok(target.clone());
        }

        let metadata = self
            .provider
            .get_metadata(&action.source_playlist_id)
            .await
            .map_err(EngineError::Remote)?;
        let name = archive_name(&metadata.name);

        let playlist = self
            .provider
            .get_or_create_playlist_by_name(&name, ARCHIVE_PUBLIC)
            .await
            .map_err(EngineError::Remote)?;

        info!(name = %name, destination = %playlist.id, "Resolved archive destination");
        Ok(playlist.id)
    }

    async fn fetch(&self, playlist: &PlaylistId) -> Result<Vec<PlaylistEntry>, EngineError> {
        let entries = self
            .provider
            .fetch_items(playlist)
            .await
            .map_err(EngineError::Remote)?;
        debug!(playlist = %playlist, count = entries.len(), "Fetched playlist");
        Ok(entries)
    }

    async fn append(&self, playlist: &PlaylistId, to_add: IdentitySet) -> Result<usize, EngineError> {
        if to_add.is_empty() {
            info!(playlist = %playlist, "No new items");
            return Ok(0);
        }

        let ids: Vec<TrackId> = to_add.into_vec();
        self.provider
            .append_items(playlist, &ids)
            .await
            .map_err(EngineError::Remote)?;

        info!(playlist = %playlist, count = ids.len(), "Appended new items");
        Ok(ids.len())
    }
}
