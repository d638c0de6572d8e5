//! Domain entities and business logic
//!
//! This module contains the core domain types for plsync:
//! - Newtypes for catalog identifiers and run identifiers
//! - Playlist entries, references and metadata as returned by the catalog
//! - Configured actions (sync, archive)
//! - Domain-specific error types

pub mod action;
pub mod errors;
pub mod newtypes;
pub mod playlist;

// Re-export commonly used types
pub use action::{
    Action, ActionKind, ArchiveAction, SyncAction, DEFAULT_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS,
};
pub use errors::DomainError;
pub use newtypes::*;
pub use playlist::{PlaylistEntry, PlaylistMetadata, PlaylistRef};
