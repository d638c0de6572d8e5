//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for catalog identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Catalog identifiers
// ============================================================================

/// Opaque identifier of a track-like item in the remote catalog
///
/// Compared by value. The catalog hands these out as base62 strings, but
/// nothing here depends on that beyond rejecting empty or whitespace-bearing
/// values, which would never survive the trip into a request URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId(String);

impl TrackId {
    /// URI scheme prefix used by the catalog when tracks are referenced by URI
    pub const URI_PREFIX: &'static str = "spotify:track:";

    /// Create a new TrackId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidTrackId(
                "Track ID cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidTrackId(format!(
                "Track ID contains whitespace: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Catalog URI form (`spotify:track:<id>`) used by mutation calls
    #[must_use]
    pub fn to_uri(&self) -> String {
        format!("{}{}", Self::URI_PREFIX, self.0)
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for TrackId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TrackId> for String {
    fn from(id: TrackId) -> Self {
        id.0
    }
}

/// Opaque identifier of a playlist-like collection in the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaylistId(String);

impl PlaylistId {
    /// Create a new PlaylistId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains characters that cannot
    /// appear in a catalog path segment
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidPlaylistId(
                "Playlist ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidPlaylistId(format!(
                "Playlist ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlaylistId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlaylistId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for PlaylistId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PlaylistId> for String {
    fn from(id: PlaylistId) -> Self {
        id.0
    }
}

// ============================================================================
// Run identifiers
// ============================================================================

/// Identifier attached to a single action invocation, carried in log spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid RunId: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod track_id_tests {
        use super::*;

        #[test]
        fn test_valid_track_id() {
            let id = TrackId::new("4uLU6hMCjMI75M1A2tKUQC".to_string()).unwrap();
            assert_eq!(id.as_str(), "4uLU6hMCjMI75M1A2tKUQC");
        }

        #[test]
        fn test_empty_rejected() {
            assert!(TrackId::new(String::new()).is_err());
        }

        #[test]
        fn test_whitespace_rejected() {
            assert!(TrackId::new("abc def".to_string()).is_err());
            assert!(TrackId::new("abc\n".to_string()).is_err());
        }

        #[test]
        fn test_to_uri() {
            let id: TrackId = "t1".parse().unwrap();
            assert_eq!(id.to_uri(), "spotify:track:t1");
        }

        #[test]
        fn test_equality_by_value() {
            let a: TrackId = "same".parse().unwrap();
            let b = TrackId::new("same".to_string()).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn test_serde_rejects_empty() {
            let result: Result<TrackId, _> = serde_json::from_str("\"\"");
            assert!(result.is_err());
        }
    }

    mod playlist_id_tests {
        use super::*;

        #[test]
        fn test_valid_playlist_id() {
            let id = PlaylistId::new("37i9dQZF1DXcBWIGoYBM5M".to_string()).unwrap();
            assert_eq!(id.to_string(), "37i9dQZF1DXcBWIGoYBM5M");
        }

        #[test]
        fn test_empty_rejected() {
            let err = PlaylistId::new(String::new()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidPlaylistId(_)));
        }

        #[test]
        fn test_path_characters_rejected() {
            assert!(PlaylistId::new("abc/def".to_string()).is_err());
            assert!(PlaylistId::new("abc?x=1".to_string()).is_err());
        }

        #[test]
        fn test_serde_roundtrip() {
            let id: PlaylistId = "pl_1".parse().unwrap();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "\"pl_1\"");
            let parsed: PlaylistId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }
    }

    mod run_id_tests {
        use super::*;

        #[test]
        fn test_new_creates_unique_ids() {
            assert_ne!(RunId::new(), RunId::new());
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<RunId, _> = "not-a-uuid".parse();
            assert!(result.is_err());
        }
    }
}
