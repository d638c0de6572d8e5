//! Playlist endpoints of the Spotify Web API
//!
//! ## Pagination
//!
//! Item and playlist listings come back a page at a time. Each page carries
//! an absolute `next` URL that is followed verbatim until it is `null`.
//! Pages are accumulated in order, and a failure on any page fails the whole
//! read so callers never see a partial playlist. A `next` link pointing at a
//! different origin than the client's base URL is rejected, since the bearer
//! token would be sent along with it.
//!
//! ## Appends
//!
//! The API accepts at most 100 URIs per append. Longer inputs are split into
//! consecutive batches sent one after another; the first failure stops the
//! sequence and already-sent batches stay applied.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use plsync_core::config::MAX_APPEND_BATCH;
use plsync_core::domain::{PlaylistEntry, PlaylistId, PlaylistMetadata, PlaylistRef, TrackId};

use crate::client::SpotifyClient;
use crate::rate_limit::EndpointCategory;

/// Field filter for item pages: only what reconciliation needs
const ITEM_FIELDS: &str = "items(added_at,track(id)),next";

/// Field filter for playlist metadata
const METADATA_FIELDS: &str = "id,name,description,snapshot_id";

/// Page size for item listings (API maximum)
const ITEM_PAGE_LIMIT: &str = "100";

/// Page size for the user's playlist listing (API maximum)
const PLAYLIST_PAGE_LIMIT: &str = "50";

/// Upper bound on followed pages; guards against a `next` link that loops
const MAX_PAGES: usize = 10_000;

// ============================================================================
// Web API response types (JSON deserialization)
// ============================================================================

/// One page of `GET /playlists/{id}/tracks`
#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<PlaylistItemObject>,
    next: Option<String>,
}

/// A playlist item; `track` is null for removed or unavailable tracks
#[derive(Debug, Deserialize)]
struct PlaylistItemObject {
    added_at: Option<DateTime<Utc>>,
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    /// Null for local files
    id: Option<String>,
}

/// One page of `GET /me/playlists`
#[derive(Debug, Deserialize)]
struct PlaylistsPage {
    #[serde(default)]
    items: Vec<Option<PlaylistObject>>,
    next: Option<String>,
}

/// Simplified or full playlist object
#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: Option<String>,
    description: Option<String>,
    snapshot_id: Option<String>,
}

impl PlaylistObject {
    fn into_ref(self) -> Result<PlaylistRef> {
        let id = PlaylistId::new(self.id).context("Catalog returned an invalid playlist ID")?;
        Ok(PlaylistRef {
            id,
            name: self.name,
            description: self.description,
            snapshot_id: self.snapshot_id,
        })
    }
}

fn parse_item(playlist: &PlaylistId, item: PlaylistItemObject) -> PlaylistEntry {
    let track_id = item
        .track
        .and_then(|t| t.id)
        .and_then(|id| match TrackId::new(id) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(playlist = %playlist, error = %e, "Ignoring unusable track id");
                None
            }
        });
    PlaylistEntry::new(playlist.clone(), track_id, item.added_at)
}

fn parse_next(base: &Url, next: Option<String>) -> Result<Option<Url>> {
    let Some(next) = next else {
        return Ok(None);
    };
    let url = Url::parse(&next).with_context(|| format!("Invalid next link: {next}"))?;
    if url.origin() != base.origin() {
        anyhow::bail!(
            "Refusing next link {next}: origin differs from {}",
            base.origin().ascii_serialization()
        );
    }
    Ok(Some(url))
}

// ============================================================================
// Playlist operations
// ============================================================================

/// Fetches every entry of a playlist, following `next` links to the end
///
/// # Errors
///
/// Returns an error if any page request fails (after client retries) or a
/// page cannot be parsed. Entries from earlier pages are discarded.
pub async fn fetch_items(client: &SpotifyClient, playlist: &PlaylistId) -> Result<Vec<PlaylistEntry>> {
    let mut url = Some(client.endpoint(
        &["playlists", playlist.as_str(), "tracks"],
        &[("fields", ITEM_FIELDS), ("limit", ITEM_PAGE_LIMIT)],
    )?);

    let mut entries = Vec::new();
    let mut pages = 0usize;

    while let Some(page_url) = url.take() {
        pages += 1;
        if pages > MAX_PAGES {
            anyhow::bail!("Playlist {playlist} exceeded {MAX_PAGES} pages");
        }

        let page: ItemsPage = client
            .request_json(Method::GET, page_url, None, EndpointCategory::Items)
            .await
            .with_context(|| format!("Failed to fetch page {pages} of playlist {playlist}"))?;

        debug!(
            playlist = %playlist,
            page = pages,
            items = page.items.len(),
            has_next = page.next.is_some(),
            "Received items page"
        );

        entries.extend(page.items.into_iter().map(|item| parse_item(playlist, item)));
        url = parse_next(client.base_url(), page.next)?;
    }

    debug!(playlist = %playlist, total = entries.len(), pages, "Fetched playlist");
    Ok(entries)
}

/// Appends tracks to a playlist in batches of at most `batch_size`
///
/// Batches are sent sequentially in input order. An empty `ids` issues no
/// request.
///
/// # Errors
///
/// Returns the first failing batch's error. Earlier batches are not rolled back.
pub async fn append_items(
    client: &SpotifyClient,
    playlist: &PlaylistId,
    ids: &[TrackId],
    batch_size: usize,
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let batch_size = batch_size.clamp(1, MAX_APPEND_BATCH);
    let url = client.endpoint(&["playlists", playlist.as_str(), "tracks"], &[])?;
    let batches = ids.len().div_ceil(batch_size);

    for (index, batch) in ids.chunks(batch_size).enumerate() {
        let uris: Vec<String> = batch.iter().map(TrackId::to_uri).collect();
        client
            .execute_with_retry(
                Method::POST,
                url.clone(),
                Some(&json!({ "uris": uris })),
                EndpointCategory::Append,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to append batch {}/{} to playlist {playlist}",
                    index + 1,
                    batches
                )
            })?;

        debug!(
            playlist = %playlist,
            batch = index + 1,
            batches,
            size = batch.len(),
            "Appended batch"
        );
    }

    info!(playlist = %playlist, count = ids.len(), batches, "Appended tracks");
    Ok(())
}

/// Retrieves a playlist's id, name, description and snapshot id
pub async fn get_metadata(client: &SpotifyClient, playlist: &PlaylistId) -> Result<PlaylistMetadata> {
    let url = client.endpoint(&["playlists", playlist.as_str()], &[("fields", METADATA_FIELDS)])?;
    let obj: PlaylistObject = client
        .request_json(Method::GET, url, None, EndpointCategory::Metadata)
        .await
        .with_context(|| format!("Failed to fetch metadata of playlist {playlist}"))?;

    let id = PlaylistId::new(obj.id).context("Catalog returned an invalid playlist ID")?;
    Ok(PlaylistMetadata {
        id,
        name: obj.name.unwrap_or_default(),
        description: obj.description,
        snapshot_id: obj.snapshot_id,
    })
}

/// Finds one of the current user's playlists by name
///
/// Comparison is case-insensitive and exact. Pages are read until the first
/// match, so later pages are only requested when needed.
pub async fn find_playlist_by_name(client: &SpotifyClient, name: &str) -> Result<Option<PlaylistRef>> {
    let wanted = name.to_lowercase();
    let mut url = Some(client.endpoint(&["me", "playlists"], &[("limit", PLAYLIST_PAGE_LIMIT)])?);
    let mut pages = 0usize;

    while let Some(page_url) = url.take() {
        pages += 1;
        if pages > MAX_PAGES {
            anyhow::bail!("Playlist listing exceeded {MAX_PAGES} pages");
        }

        let page: PlaylistsPage = client
            .request_json(Method::GET, page_url, None, EndpointCategory::Playlists)
            .await
            .with_context(|| format!("Failed to list playlists (page {pages})"))?;

        let found = page.items.into_iter().flatten().find(|p| {
            p.name
                .as_deref()
                .is_some_and(|n| n.to_lowercase() == wanted)
        });
        if let Some(found) = found {
            debug!(name, id = %found.id, "Found playlist by name");
            return found.into_ref().map(Some);
        }

        url = parse_next(client.base_url(), page.next)?;
    }

    debug!(name, pages, "No playlist with that name");
    Ok(None)
}

/// Creates a playlist owned by the current user
pub async fn create_playlist(client: &SpotifyClient, name: &str, public: bool) -> Result<PlaylistRef> {
    let user_id = client
        .current_user_id()
        .await
        .context("Failed to resolve the current user")?;
    let url = client.endpoint(&["users", user_id.as_str(), "playlists"], &[])?;

    let obj: PlaylistObject = client
        .request_json(
            Method::POST,
            url,
            Some(&json!({ "name": name, "public": public })),
            EndpointCategory::Playlists,
        )
        .await
        .with_context(|| format!("Failed to create playlist '{name}'"))?;

    info!(name, id = %obj.id, public, "Created playlist");
    obj.into_ref()
}
