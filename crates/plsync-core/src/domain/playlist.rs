//! Playlist entries and references as seen by the reconciliation engine
//!
//! Entries are produced only by a catalog provider and are read-only to the
//! rest of the system. Both the track identity and the timestamp are optional
//! here because the catalog does return entries without a track (removed or
//! local files); the mapper decides what to do with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{PlaylistId, TrackId};

/// A single entry of a fetched playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Playlist this entry was fetched from
    pub playlist_id: PlaylistId,
    /// Identity of the referenced track, if the catalog returned one
    pub track_id: Option<TrackId>,
    /// When the track was added to the playlist, normalized to UTC
    pub added_at: Option<DateTime<Utc>>,
}

impl PlaylistEntry {
    pub fn new(
        playlist_id: PlaylistId,
        track_id: Option<TrackId>,
        added_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            playlist_id,
            track_id,
            added_at,
        }
    }
}

/// Handle on a remote playlist with whatever descriptive fields are known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: PlaylistId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque version marker the catalog changes on every mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

impl PlaylistRef {
    /// Reference with only the identifier known
    pub fn new(id: PlaylistId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            snapshot_id: None,
        }
    }

    /// Attach a display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Descriptive metadata of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

impl From<PlaylistMetadata> for PlaylistRef {
    fn from(meta: PlaylistMetadata) -> Self {
        Self {
            id: meta.id,
            name: Some(meta.name),
            description: meta.description,
            snapshot_id: meta.snapshot_id,
        }
    }
}
