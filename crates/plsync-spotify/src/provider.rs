//! SpotifyCatalogProvider - ICatalogProvider implementation for the Spotify Web API
//!
//! Wraps the [`SpotifyClient`] and delegates to the [`playlist`](crate::playlist)
//! module to fulfil the [`ICatalogProvider`] port contract.
//!
//! The client needs no `&mut` access after construction (the user ID cache
//! is a `OnceCell`), so it is held directly rather than behind a mutex and
//! concurrent reads from the engine run in parallel.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use plsync_core::config::{Config, MAX_APPEND_BATCH};
use plsync_core::domain::{PlaylistEntry, PlaylistId, PlaylistMetadata, PlaylistRef, TrackId};
use plsync_core::ports::{ICatalogProvider, ICredentialProvider};

use crate::client::SpotifyClient;
use crate::playlist as endpoints;
use crate::rate_limit::{AdaptiveRateLimiter, RateLimitConfig};

/// Catalog provider backed by the Spotify Web API
pub struct SpotifyCatalogProvider {
    client: SpotifyClient,
    append_batch_size: usize,
}

impl SpotifyCatalogProvider {
    /// Creates a provider around an existing client, appending in batches of 100
    pub fn new(client: SpotifyClient) -> Self {
        Self {
            client,
            append_batch_size: MAX_APPEND_BATCH,
        }
    }

    /// Builds client, rate limiter and provider from the full configuration
    pub fn from_config(config: &Config, credentials: Arc<dyn ICredentialProvider>) -> Result<Self> {
        let limiter = Arc::new(AdaptiveRateLimiter::new(RateLimitConfig::from(
            config.rate_limiting.clone(),
        )));
        let client = SpotifyClient::from_config(&config.catalog, credentials)?
            .with_rate_limiter(limiter);
        Ok(Self::new(client).with_append_batch_size(config.catalog.append_batch_size))
    }

    /// Overrides the append batch size (clamped to 1..=100)
    pub fn with_append_batch_size(mut self, size: usize) -> Self {
        self.append_batch_size = size.clamp(1, MAX_APPEND_BATCH);
        self
    }

    pub fn client(&self) -> &SpotifyClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ICatalogProvider for SpotifyCatalogProvider {
    async fn fetch_items(&self, playlist: &PlaylistId) -> Result<Vec<PlaylistEntry>> {
        debug!(playlist = %playlist, "SpotifyCatalogProvider::fetch_items");
        endpoints::fetch_items(&self.client, playlist).await
    }

    async fn append_items(&self, playlist: &PlaylistId, ids: &[TrackId]) -> Result<()> {
        debug!(playlist = %playlist, count = ids.len(), "SpotifyCatalogProvider::append_items");
        endpoints::append_items(&self.client, playlist, ids, self.append_batch_size).await
    }

    async fn get_metadata(&self, playlist: &PlaylistId) -> Result<PlaylistMetadata> {
        debug!(playlist = %playlist, "SpotifyCatalogProvider::get_metadata");
        endpoints::get_metadata(&self.client, playlist).await
    }

    async fn find_playlist_by_name(&self, name: &str) -> Result<Option<PlaylistRef>> {
        debug!(name, "SpotifyCatalogProvider::find_playlist_by_name");
        endpoints::find_playlist_by_name(&self.client, name).await
    }

    async fn create_playlist(&self, name: &str, public: bool) -> Result<PlaylistRef> {
        debug!(name, public, "SpotifyCatalogProvider::create_playlist");
        endpoints::create_playlist(&self.client, name, public).await
    }
}
