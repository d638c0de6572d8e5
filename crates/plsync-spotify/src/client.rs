//! Spotify Web API client
//!
//! Provides a typed HTTP client for the catalog API. Handles authentication
//! headers, endpoint construction, per-request timeouts, proactive rate
//! limiting and retry of transient failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plsync_spotify::auth::StaticTokenProvider;
//! use plsync_spotify::client::SpotifyClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SpotifyClient::new(Arc::new(StaticTokenProvider::new("access-token")))?;
//! let user = client.current_user_id().await?;
//! println!("Hello, {user}");
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use plsync_core::{config::CatalogConfig, ports::ICredentialProvider};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::rate_limit::{parse_retry_after, AdaptiveRateLimiter, EndpointCategory};
use crate::SpotifyError;

/// Base URL for the Spotify Web API
pub const SPOTIFY_BASE_URL: &str = "https://api.spotify.com/v1";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry-after duration when a 429 carries no header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Default number of retries of a single request
const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff step for 5xx / network retries; doubles per attempt
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Response from the /me endpoint
#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
}

// ============================================================================
// SpotifyClient
// ============================================================================

/// HTTP client for Spotify Web API calls
///
/// Wraps `reqwest::Client` with bearer authentication from an
/// [`ICredentialProvider`], URL construction against a configurable base,
/// and an optional shared [`AdaptiveRateLimiter`].
pub struct SpotifyClient {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn ICredentialProvider>,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
    max_retries: u32,
    retry_backoff: Duration,
    /// Owner of created playlists; configured or fetched once from /me
    user_id: OnceCell<String>,
}

impl SpotifyClient {
    /// Creates a client against the public Spotify API with default settings
    pub fn new(credentials: Arc<dyn ICredentialProvider>) -> Result<Self, SpotifyError> {
        Self::with_base_url(credentials, SPOTIFY_BASE_URL)
    }

    /// Creates a client against a custom base URL (useful for testing)
    ///
    /// # Errors
    /// Returns [`SpotifyError::InvalidUrl`] if `base_url` does not parse or
    /// cannot carry path segments
    pub fn with_base_url(
        credentials: Arc<dyn ICredentialProvider>,
        base_url: impl AsRef<str>,
    ) -> Result<Self, SpotifyError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| SpotifyError::InvalidUrl(format!("{}: {e}", base_url.as_ref())))?;
        if base_url.cannot_be_a_base() {
            return Err(SpotifyError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            base_url,
            credentials,
            rate_limiter: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            user_id: OnceCell::new(),
        })
    }

    /// Creates a client from the `catalog` configuration section
    pub fn from_config(
        config: &CatalogConfig,
        credentials: Arc<dyn ICredentialProvider>,
    ) -> Result<Self, SpotifyError> {
        let mut client = Self::with_base_url(credentials, &config.base_url)?
            .with_timeout(Duration::from_secs(config.request_timeout_secs))?
            .with_max_retries(config.max_retries);
        if let Some(user_id) = &config.user_id {
            client = client.with_user_id(user_id.clone());
        }
        Ok(client)
    }

    /// Replaces the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SpotifyError> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    /// Sets the adaptive rate limiter for this client.
    ///
    /// When present, every request first acquires a token for its endpoint
    /// category and reports successes and throttles back to the limiter.
    pub fn with_rate_limiter(mut self, limiter: Arc<AdaptiveRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// First backoff step used between 5xx / network retries
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Presets the user ID so that `/me` is never called
    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        Self {
            user_id: OnceCell::new_with(Some(user_id.into())),
            ..self
        }
    }

    pub fn rate_limiter(&self) -> Option<&Arc<AdaptiveRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL from path segments and query pairs
    ///
    /// Segments are percent-encoded, so IDs can be passed as-is.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, SpotifyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SpotifyError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// ID of the authenticated user, fetched from `/me` on first use
    pub async fn current_user_id(&self) -> Result<String, SpotifyError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let url = self.endpoint(&["me"], &[])?;
                let me: MeResponse = self
                    .request_json(Method::GET, url, None, EndpointCategory::Metadata)
                    .await?;
                debug!(user_id = %me.id, "Resolved current user");
                Ok::<_, SpotifyError>(me.id)
            })
            .await?;
        Ok(id.clone())
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    /// Sends a request and decodes a JSON response body
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        category: EndpointCategory,
    ) -> Result<T, SpotifyError> {
        let response = self.execute_with_retry(method, url.clone(), body, category).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SpotifyError::InvalidResponse(format!("{url}: {e}")))
    }

    /// Executes an HTTP request with rate limiting and retries.
    ///
    /// 1. **Proactive rate limiting**: acquires a token for `category` when a
    ///    limiter is configured.
    /// 2. **429 handling**: honours `Retry-After`, notifies the limiter and
    ///    retries. A 429 means the request was not processed, so this applies
    ///    to every method.
    /// 3. **Transient failures**: 5xx, timeouts and connection errors are
    ///    retried with exponential backoff, for `GET` only. A failed `POST`
    ///    may already have been applied and is surfaced instead.
    /// 4. Any other non-success status is mapped to a [`SpotifyError`].
    ///
    /// Each attempt is bounded by the client timeout.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        category: EndpointCategory,
    ) -> Result<Response, SpotifyError> {
        let idempotent = method == Method::GET;
        let mut attempt: u32 = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire(category).await;
            }

            let token = self
                .credentials
                .access_token()
                .await
                .map_err(|e| SpotifyError::Credentials(format!("{e:#}")))?;

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                        .unwrap_or(DEFAULT_RETRY_AFTER);

                    if let Some(limiter) = &self.rate_limiter {
                        limiter.on_throttle(category);
                    }

                    if attempt >= self.max_retries {
                        warn!(%url, attempts = attempt + 1, "429 retry limit exhausted");
                        return Err(SpotifyError::TooManyRequests { retry_after });
                    }

                    info!(
                        %url,
                        attempt,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Received 429, backing off"
                    );
                    tokio::time::sleep(retry_after).await;
                    attempt += 1;
                    continue;
                }
                Ok(response) if response.status().is_success() => {
                    if let Some(limiter) = &self.rate_limiter {
                        limiter.on_success(category);
                    }
                    if attempt > 0 {
                        info!(%url, attempt, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => status_error(&method, &url, response).await,
                Err(e) if e.is_timeout() => SpotifyError::Timeout(format!("{method} {url}")),
                Err(e) => SpotifyError::Network(e),
            };

            if !(idempotent && error.is_transient()) || attempt >= self.max_retries {
                return Err(error);
            }

            let backoff = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
            warn!(
                %url,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, SpotifyError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SpotifyError::Network)
}

/// Maps a non-success, non-429 response to an error, reading the body for context
async fn status_error(method: &Method, url: &Url, response: Response) -> SpotifyError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = format!("{method} {url}: {}", error_message(&body));

    match status {
        StatusCode::UNAUTHORIZED => SpotifyError::Unauthorized(message),
        StatusCode::FORBIDDEN => SpotifyError::Forbidden(message),
        StatusCode::NOT_FOUND => SpotifyError::NotFound(message),
        s if s.is_server_error() => SpotifyError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => SpotifyError::BadRequest {
            status: s.as_u16(),
            message,
        },
    }
}

/// Extracts `error.message` from a Web API error body, falling back to the raw text
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
