//! Catalog provider port (driven/secondary port)
//!
//! This module defines the interface the reconciliation engine uses to read
//! and mutate playlists in the remote catalog. The production adapter talks
//! to the Spotify Web API; tests use in-memory fakes.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and the engine only needs to know that a remote call failed.
//! - Uses `#[async_trait]` for async trait methods.
//! - Implementations retry transient failures of a single request (429, 5xx,
//!   network) internally; an error returned from here is final for the call.

use crate::domain::{PlaylistEntry, PlaylistId, PlaylistMetadata, PlaylistRef, TrackId};

/// Interface for playlist operations against the remote catalog
#[async_trait::async_trait]
pub trait ICatalogProvider: Send + Sync {
    /// Fetches every entry of a playlist, following pagination to the end
    ///
    /// Entries are returned in page order. A failure on any page fails the
    /// whole call; partial results are never returned.
    ///
    /// # Arguments
    /// * `playlist` - The playlist to read
    async fn fetch_items(&self, playlist: &PlaylistId) -> anyhow::Result<Vec<PlaylistEntry>>;

    /// Appends tracks to the end of a playlist, in the given order
    ///
    /// Large inputs are split into batches the catalog accepts and sent
    /// sequentially. The first failing batch aborts the call; batches that
    /// already landed stay applied. An empty `ids` issues no request.
    ///
    /// # Arguments
    /// * `playlist` - The playlist to append to
    /// * `ids` - Tracks to append
    async fn append_items(&self, playlist: &PlaylistId, ids: &[TrackId]) -> anyhow::Result<()>;

    /// Retrieves the playlist's descriptive metadata
    async fn get_metadata(&self, playlist: &PlaylistId) -> anyhow::Result<PlaylistMetadata>;

    /// Looks up one of the current user's playlists by display name
    ///
    /// Matching is case-insensitive and exact; the first match wins.
    ///
    /// # Returns
    /// `None` when no playlist has that name
    async fn find_playlist_by_name(&self, name: &str) -> anyhow::Result<Option<PlaylistRef>>;

    /// Creates a playlist owned by the current user
    async fn create_playlist(&self, name: &str, public: bool) -> anyhow::Result<PlaylistRef>;

    /// Returns the playlist with this name, creating it when absent
    ///
    /// Not atomic: two concurrent callers may both create a playlist.
    async fn get_or_create_playlist_by_name(
        &self,
        name: &str,
        public: bool,
    ) -> anyhow::Result<PlaylistRef> {
        if let Some(existing) = self.find_playlist_by_name(name).await? {
            return Ok(existing);
        }
        tracing::info!(name, public, "Playlist not found, creating it");
        self.create_playlist(name, public).await
    }
}
