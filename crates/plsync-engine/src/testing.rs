//! In-memory catalog used by engine and dispatcher tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use plsync_core::domain::{PlaylistEntry, PlaylistId, PlaylistMetadata, PlaylistRef, TrackId};
use plsync_core::ports::ICatalogProvider;

pub(crate) fn pid(id: &str) -> PlaylistId {
    id.parse().unwrap()
}

pub(crate) fn tid(id: &str) -> TrackId {
    id.parse().unwrap()
}

pub(crate) fn tids(ids: &[&str]) -> Vec<TrackId> {
    ids.iter().map(|id| tid(id)).collect()
}

#[derive(Default)]
struct Inner {
    names: HashMap<PlaylistId, String>,
    entries: HashMap<PlaylistId, Vec<PlaylistEntry>>,
    listing: Vec<PlaylistId>,
    fetches: Vec<PlaylistId>,
    appends: Vec<(PlaylistId, Vec<TrackId>)>,
    failing_fetches: HashSet<PlaylistId>,
    fail_append_batch: Option<usize>,
    created: usize,
}

/// Catalog fake that stores playlists in memory and records every call
pub(crate) struct InMemoryCatalog {
    inner: Mutex<Inner>,
    batch_size: usize,
    fetch_delay: Option<Duration>,
}

impl InMemoryCatalog {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            batch_size: 100,
            fetch_delay: None,
        }
    }

    pub(crate) fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Every fetch sleeps for `delay` before answering
    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Adds a playlist whose tracks were all added just now
    pub(crate) fn with_playlist(self, id: &str, name: &str, tracks: &[&str]) -> Self {
        let now = Utc::now();
        let dated: Vec<_> = tracks.iter().map(|t| (*t, Some(now))).collect();
        self.with_dated_playlist(id, name, &dated)
    }

    pub(crate) fn with_dated_playlist(
        self,
        id: &str,
        name: &str,
        tracks: &[(&str, Option<DateTime<Utc>>)],
    ) -> Self {
        let playlist = pid(id);
        let entries = tracks
            .iter()
            .map(|(t, added_at)| PlaylistEntry::new(playlist.clone(), Some(tid(t)), *added_at))
            .collect();
        self.with_entries(id, name, entries)
    }

    pub(crate) fn with_entries(self, id: &str, name: &str, entries: Vec<PlaylistEntry>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let playlist = pid(id);
            inner.names.insert(playlist.clone(), name.to_string());
            inner.entries.insert(playlist.clone(), entries);
            inner.listing.push(playlist);
        }
        self
    }

    pub(crate) fn fail_fetch(&self, id: &str) {
        self.inner.lock().unwrap().failing_fetches.insert(pid(id));
    }

    pub(crate) fn heal_fetch(&self, id: &str) {
        self.inner.lock().unwrap().failing_fetches.remove(&pid(id));
    }

    /// The next append fails on its `batch`-th chunk (1-based), once
    pub(crate) fn fail_append_on_batch(&self, batch: usize) {
        self.inner.lock().unwrap().fail_append_batch = Some(batch);
    }

    pub(crate) fn tracks(&self, id: &str) -> Vec<TrackId> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .get(&pid(id))
            .map(|e| e.iter().filter_map(|e| e.track_id.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn appends(&self) -> Vec<(PlaylistId, Vec<TrackId>)> {
        self.inner.lock().unwrap().appends.clone()
    }

    pub(crate) fn fetches(&self) -> Vec<PlaylistId> {
        self.inner.lock().unwrap().fetches.clone()
    }

    pub(crate) fn created(&self) -> usize {
        self.inner.lock().unwrap().created
    }

    pub(crate) fn playlist_named(&self, name: &str) -> Option<PlaylistId> {
        let inner = self.inner.lock().unwrap();
        inner
            .listing
            .iter()
            .find(|id| inner.names.get(*id).is_some_and(|n| n == name))
            .cloned()
    }
}

#[async_trait::async_trait]
impl ICatalogProvider for InMemoryCatalog {
    async fn fetch_items(&self, playlist: &PlaylistId) -> anyhow::Result<Vec<PlaylistEntry>> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.fetches.push(playlist.clone());
        if inner.failing_fetches.contains(playlist) {
            anyhow::bail!("Failed to fetch page 2 of playlist {playlist}: HTTP 503");
        }
        inner
            .entries
            .get(playlist)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Not found: playlist {playlist}"))
    }

    async fn append_items(&self, playlist: &PlaylistId, ids: &[TrackId]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(playlist) {
            anyhow::bail!("Not found: playlist {playlist}");
        }
        inner.appends.push((playlist.clone(), ids.to_vec()));
        let batches = ids.len().div_ceil(self.batch_size);
        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            if inner.fail_append_batch == Some(index + 1) {
                inner.fail_append_batch = None;
                anyhow::bail!(
                    "Failed to append batch {}/{batches} to playlist {playlist}: HTTP 500",
                    index + 1
                );
            }
            let now = Utc::now();
            let added: Vec<_> = batch
                .iter()
                .map(|id| PlaylistEntry::new(playlist.clone(), Some(id.clone()), Some(now)))
                .collect();
            if let Some(entries) = inner.entries.get_mut(playlist) {
                entries.extend(added);
            }
        }
        Ok(())
    }

    async fn get_metadata(&self, playlist: &PlaylistId) -> anyhow::Result<PlaylistMetadata> {
        let inner = self.inner.lock().unwrap();
        let name = inner
            .names
            .get(playlist)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Not found: playlist {playlist}"))?;
        Ok(PlaylistMetadata {
            id: playlist.clone(),
            name,
            description: None,
            snapshot_id: None,
        })
    }

    async fn find_playlist_by_name(&self, name: &str) -> anyhow::Result<Option<PlaylistRef>> {
        let inner = self.inner.lock().unwrap();
        let wanted = name.to_lowercase();
        Ok(inner
            .listing
            .iter()
            .find(|id| {
                inner
                    .names
                    .get(*id)
                    .is_some_and(|n| n.to_lowercase() == wanted)
            })
            .map(|id| PlaylistRef::new(id.clone()).with_name(inner.names[id].clone())))
    }

    async fn create_playlist(&self, name: &str, _public: bool) -> anyhow::Result<PlaylistRef> {
        let mut inner = self.inner.lock().unwrap();
        inner.created += 1;
        let id = pid(&format!("created{}", inner.created));
        inner.names.insert(id.clone(), name.to_string());
        inner.entries.insert(id.clone(), Vec::new());
        inner.listing.push(id.clone());
        Ok(PlaylistRef::new(id).with_name(name))
    }
}
