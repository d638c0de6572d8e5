//! plsync Spotify - catalog adapter for the Spotify Web API
//!
//! Provides async access to:
//! - Paginated playlist item reads
//! - Batched track appends
//! - Playlist metadata, lookup by name and creation
//!
//! ## Modules
//!
//! - [`auth`] - Bearer token providers
//! - [`client`] - HTTP client with rate limiting, timeouts and retries
//! - [`playlist`] - Playlist endpoints and response parsing
//! - [`provider`] - [`ICatalogProvider`](plsync_core::ports::ICatalogProvider) implementation
//! - [`rate_limit`] - Per-category adaptive token buckets

pub mod auth;
pub mod client;
pub mod playlist;
pub mod provider;
pub mod rate_limit;

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when communicating with the Spotify Web API
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The access token is missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token lacks the scope required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested playlist or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected as malformed (400 and other 4xx)
    #[error("Bad request ({status}): {message}")]
    BadRequest {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded and retries exhausted
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked us to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        status: u16,
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The credential provider could not supply a token
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A request URL could not be built from the base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SpotifyError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SpotifyError::TooManyRequests { .. }
                | SpotifyError::ServerError { .. }
                | SpotifyError::Timeout(_)
                | SpotifyError::Network(_)
        )
    }
}
