//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! identifier validation, malformed playlist entries, and action records
//! that cannot be turned into a typed [`Action`](super::action::Action).

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid track identifier
    #[error("Invalid track ID: {0}")]
    InvalidTrackId(String),

    /// Invalid playlist identifier
    #[error("Invalid playlist ID: {0}")]
    InvalidPlaylistId(String),

    /// A fetched playlist entry is missing a required field
    #[error("Malformed entry at position {index} of playlist {playlist}: {reason}")]
    MalformedEntry {
        /// Playlist the entry was fetched from
        playlist: String,
        /// Zero-based position of the entry in the fetched list
        index: usize,
        /// Which field was missing or unusable
        reason: String,
    },

    /// The action record names a kind other than `sync` or `archive`
    #[error("Unknown action type: {0}")]
    UnknownActionKind(String),

    /// The action record has missing or ill-typed parameters
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
