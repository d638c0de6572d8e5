//! Rate limiting and adaptive throttling for the catalog Web API
//!
//! Provides proactive rate limiting so that bursts of pagination or append
//! calls do not trip HTTP 429 (Too Many Requests) responses.
//!
//! ## Architecture
//!
//! - [`TokenBucket`]: Classic token bucket for one endpoint category
//! - [`AdaptiveRateLimiter`]: One bucket per [`EndpointCategory`], halving a
//!   bucket's capacity on 429 and slowly restoring it on success
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plsync_spotify::rate_limit::{AdaptiveRateLimiter, EndpointCategory, RateLimitConfig};
//!
//! # async fn example() {
//! let limiter = AdaptiveRateLimiter::new(RateLimitConfig::default());
//! limiter.acquire(EndpointCategory::Items).await;
//! // ... make API call ...
//! limiter.on_success(EndpointCategory::Items);
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use plsync_core::config::RateLimitingConfig;
use tracing::{debug, info, warn};

/// Consecutive successes needed before a throttled bucket grows again
const RECOVERY_THRESHOLD: u64 = 100;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Endpoint categories
// ============================================================================

/// Group of catalog endpoints sharing one request budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    /// Paging through playlist items
    Items,
    /// Adding tracks to a playlist
    Append,
    /// Playlist metadata and the current user profile
    Metadata,
    /// Listing and creating the user's playlists
    Playlists,
}

impl EndpointCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Items => "items",
            EndpointCategory::Append => "append",
            EndpointCategory::Metadata => "metadata",
            EndpointCategory::Playlists => "playlists",
        }
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TokenBucket
// ============================================================================

#[derive(Debug)]
struct BucketState {
    /// Fractional for smooth refill
    tokens: f64,
    last_refill: Instant,
    /// Capacity after throttle adjustments, never above the original
    effective_capacity: u32,
    successes: u64,
}

/// Token bucket rate limiter for a single endpoint category.
///
/// Tokens are consumed on each request and refilled at a constant rate.
/// When no tokens are available callers must wait for refill.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    /// Tokens added per second
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a new `TokenBucket`. The bucket starts full.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens
    /// * `refill_rate` - Tokens added per second
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
                effective_capacity: capacity,
                successes: 0,
            }),
        }
    }

    /// Bucket allowing `per_minute` requests per minute, bursting up to that many
    pub fn per_minute(per_minute: u32) -> Self {
        Self::new(per_minute, f64::from(per_minute) / 60.0)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_rate)
                .min(f64::from(state.effective_capacity));
            state.last_refill = now;
        }
    }

    /// Takes one token if available.
    pub fn try_acquire(&self) -> bool {
        let mut state = lock(&self.state);
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until a token becomes available; 0.0 if one is available now.
    pub fn time_until_available(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            0.0
        } else if self.refill_rate > 0.0 {
            (1.0 - state.tokens) / self.refill_rate
        } else {
            f64::MAX
        }
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state);
        state.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn effective_capacity(&self) -> u32 {
        lock(&self.state).effective_capacity
    }

    /// Records a successful call. Every [`RECOVERY_THRESHOLD`] consecutive
    /// successes grow the effective capacity by 5%, up to the original.
    pub fn on_success(&self) {
        let mut state = lock(&self.state);
        state.successes += 1;

        if state.successes % RECOVERY_THRESHOLD == 0 && state.effective_capacity < self.capacity {
            let increase = (f64::from(state.effective_capacity) * 0.05).max(1.0) as u32;
            let new_cap = (state.effective_capacity + increase).min(self.capacity);
            debug!(
                old_capacity = state.effective_capacity,
                new_capacity = new_cap,
                successes = state.successes,
                "Adaptive recovery: increasing bucket capacity"
            );
            state.effective_capacity = new_cap;
        }
    }

    /// Records a 429: halves the effective capacity (minimum 1) and resets
    /// the success streak.
    pub fn on_throttle(&self) {
        let mut state = lock(&self.state);
        let old = state.effective_capacity;
        state.effective_capacity = (old / 2).max(1);
        state.tokens = state.tokens.min(f64::from(state.effective_capacity));
        state.successes = 0;
        warn!(
            old_capacity = old,
            new_capacity = state.effective_capacity,
            "Throttle detected: reducing bucket capacity by 50%"
        );
    }
}

// ============================================================================
// RateLimitConfig
// ============================================================================

/// Bucket parameters per endpoint category.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per minute for categories without an explicit entry
    pub default_per_minute: u32,
    pub per_minute: HashMap<EndpointCategory, u32>,
}

impl RateLimitConfig {
    /// Budget for one category
    pub fn budget(&self, category: EndpointCategory) -> u32 {
        self.per_minute
            .get(&category)
            .copied()
            .unwrap_or(self.default_per_minute)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitingConfig::default().into()
    }
}

impl From<RateLimitingConfig> for RateLimitConfig {
    fn from(cfg: RateLimitingConfig) -> Self {
        let per_minute = HashMap::from([
            (EndpointCategory::Items, cfg.items_requests_per_minute),
            (EndpointCategory::Append, cfg.append_requests_per_minute),
            (EndpointCategory::Metadata, cfg.metadata_requests_per_minute),
            (EndpointCategory::Playlists, cfg.playlists_requests_per_minute),
        ]);
        Self {
            default_per_minute: 60,
            per_minute,
        }
    }
}

// ============================================================================
// AdaptiveRateLimiter
// ============================================================================

/// Rate limiter holding one [`TokenBucket`] per endpoint category.
///
/// Shared between clients via `Arc<AdaptiveRateLimiter>`.
pub struct AdaptiveRateLimiter {
    buckets: Mutex<HashMap<EndpointCategory, TokenBucket>>,
    config: RateLimitConfig,
}

impl fmt::Debug for AdaptiveRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn with_bucket<F, R>(&self, category: EndpointCategory, f: F) -> R
    where
        F: FnOnce(&TokenBucket) -> R,
    {
        let mut buckets = lock(&self.buckets);
        let bucket = buckets.entry(category).or_insert_with(|| {
            let per_minute = self.config.budget(category);
            debug!(%category, per_minute, "Creating token bucket");
            TokenBucket::per_minute(per_minute)
        });
        f(bucket)
    }

    /// Waits until a token for `category` is available and takes it.
    pub async fn acquire(&self, category: EndpointCategory) {
        loop {
            if self.with_bucket(category, TokenBucket::try_acquire) {
                return;
            }

            let wait_secs = self.with_bucket(category, TokenBucket::time_until_available);
            let wait = Duration::from_secs_f64(wait_secs.clamp(0.01, 60.0));
            debug!(
                %category,
                wait_ms = wait.as_millis() as u64,
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub fn on_success(&self, category: EndpointCategory) {
        self.with_bucket(category, TokenBucket::on_success);
    }

    pub fn on_throttle(&self, category: EndpointCategory) {
        info!(%category, "Recording throttle event");
        self.with_bucket(category, TokenBucket::on_throttle);
    }

    /// Effective capacity of a category's bucket, `None` before first use
    pub fn effective_capacity(&self, category: EndpointCategory) -> Option<u32> {
        lock(&self.buckets)
            .get(&category)
            .map(TokenBucket::effective_capacity)
    }
}

// ============================================================================
// Retry-After parsing
// ============================================================================

/// Longest wait honoured from a Retry-After header
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Parses a Retry-After header value into a Duration.
///
/// Accepts integer seconds (`"30"`) or an HTTP-date. Falls back to `default`
/// when the value cannot be parsed or lies in the past.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(wait) = diff.to_std() {
            return wait.min(MAX_RETRY_AFTER);
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
