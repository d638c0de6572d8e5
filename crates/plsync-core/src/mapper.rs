//! Identity mapper
//!
//! Turns fetched playlist entries into the shapes the reconciliation engine
//! compares: a de-duplicated identity set, a recency-filtered entry list and
//! a recency-ordered identity list. Nothing here is persisted; every engine
//! invocation recomputes these from a fresh fetch.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{DomainError, PlaylistEntry, TrackId};

// ============================================================================
// IdentitySet
// ============================================================================

/// De-duplicated set of track identities.
///
/// Equality ignores order. Iteration yields identities in first-seen order so
/// that appends derived from a set are deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct IdentitySet {
    order: Vec<TrackId>,
    members: HashSet<TrackId>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identity; returns `false` if it was already present
    pub fn insert(&mut self, id: TrackId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identities in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &TrackId> {
        self.order.iter()
    }

    /// Members of `self` absent from `other`, keeping `self`'s order
    #[must_use]
    pub fn difference(&self, other: &IdentitySet) -> IdentitySet {
        self.order
            .iter()
            .filter(|id| !other.contains(id))
            .cloned()
            .collect()
    }

    pub fn into_vec(self) -> Vec<TrackId> {
        self.order
    }
}

impl PartialEq for IdentitySet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for IdentitySet {}

impl FromIterator<TrackId> for IdentitySet {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        let mut set = IdentitySet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl IntoIterator for IdentitySet {
    type Item = TrackId;
    type IntoIter = std::vec::IntoIter<TrackId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

// ============================================================================
// Mapping operations
// ============================================================================

/// Build the identity set of a fetched playlist.
///
/// # Errors
///
/// Returns [`DomainError::MalformedEntry`] for the first entry without a
/// track identity. Such entries are never skipped silently: a missing
/// identity usually means the catalog's response shape changed.
pub fn to_identity_set(entries: &[PlaylistEntry]) -> Result<IdentitySet, DomainError> {
    let mut set = IdentitySet::new();
    for (index, entry) in entries.iter().enumerate() {
        let id = entry
            .track_id
            .as_ref()
            .ok_or_else(|| DomainError::MalformedEntry {
                playlist: entry.playlist_id.to_string(),
                index,
                reason: "missing track id".to_string(),
            })?;
        set.insert(id.clone());
    }
    Ok(set)
}

/// Entries added within `window_seconds` of now (UTC), in their original order
pub fn filter_by_recency(entries: &[PlaylistEntry], window_seconds: u64) -> Vec<PlaylistEntry> {
    filter_by_recency_at(entries, window_seconds, Utc::now())
}

/// Entries added within `window_seconds` of `now`, in their original order.
///
/// The boundary is inclusive: an entry exactly `window_seconds` old is kept.
/// Entries without an `added_at` timestamp are dropped.
pub fn filter_by_recency_at(
    entries: &[PlaylistEntry],
    window_seconds: u64,
    now: DateTime<Utc>,
) -> Vec<PlaylistEntry> {
    let window = i64::try_from(window_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    entries
        .iter()
        .filter(|entry| match entry.added_at {
            Some(added_at) => now.signed_duration_since(added_at) <= window,
            None => false,
        })
        .cloned()
        .collect()
}

/// Track identities ordered oldest-added first.
///
/// Entries lacking a track or a timestamp are skipped. Ties keep fetch order.
pub fn to_ordered_ids(entries: &[PlaylistEntry]) -> Vec<TrackId> {
    let mut dated: Vec<(DateTime<Utc>, &TrackId)> = entries
        .iter()
        .filter_map(|entry| Some((entry.added_at?, entry.track_id.as_ref()?)))
        .collect();
    dated.sort_by_key(|(added_at, _)| *added_at);
    dated.into_iter().map(|(_, id)| id.clone()).collect()
}
