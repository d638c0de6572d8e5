//! Configuration module for plsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! The catalog access token is never read from this file; it is supplied by
//! the credential provider at runtime.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration for plsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub rate_limiting: RateLimitingConfig,
    pub scheduler: SchedulerConfig,
    pub actions: ActionsConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Remote catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog Web API.
    pub base_url: String,
    /// Owner of playlists created by archive actions. Fetched from the API when unset.
    pub user_id: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retries of a single request on 429 / 5xx / network errors.
    pub max_retries: u32,
    /// Tracks per append request (the catalog accepts at most 100).
    pub append_batch_size: usize,
}

/// Per-endpoint-category request budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    pub items_requests_per_minute: u32,
    pub append_requests_per_minute: u32,
    pub metadata_requests_per_minute: u32,
    pub playlists_requests_per_minute: u32,
}

/// Scheduled-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Heartbeat period of the scheduler loop in seconds.
    pub tick_seconds: u64,
    /// Run every action once before the first scheduled tick.
    pub run_on_start: bool,
}

/// Where the action file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    pub file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

/// HTTP surface for editing the action file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub addr: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path`, or [`Config::default`] when the file does not exist.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read or parsed is an error, never a
    /// silent fallback to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/plsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("plsync")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Largest batch the catalog accepts on a single append call.
pub const MAX_APPEND_BATCH: usize = 100;

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            user_id: None,
            request_timeout_secs: 30,
            max_retries: 3,
            append_batch_size: MAX_APPEND_BATCH,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            items_requests_per_minute: 120,
            append_requests_per_minute: 60,
            metadata_requests_per_minute: 120,
            playlists_requests_per_minute: 60,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1,
            run_on_start: true,
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            file: config_dir().join("actions.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"catalog.max_retries"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- catalog ---
        if url::Url::parse(&self.catalog.base_url).is_err() {
            errors.push(ValidationError {
                field: "catalog.base_url".into(),
                message: format!("not a valid URL: {}", self.catalog.base_url),
            });
        }
        if matches!(&self.catalog.user_id, Some(id) if id.trim().is_empty()) {
            errors.push(ValidationError {
                field: "catalog.user_id".into(),
                message: "must not be empty when set".into(),
            });
        }
        positive(
            &mut errors,
            "catalog.request_timeout_secs",
            self.catalog.request_timeout_secs,
        );
        if self.catalog.append_batch_size == 0 || self.catalog.append_batch_size > MAX_APPEND_BATCH
        {
            errors.push(ValidationError {
                field: "catalog.append_batch_size".into(),
                message: format!("must be in range 1..={MAX_APPEND_BATCH}"),
            });
        }

        // --- rate_limiting ---
        let rl = &self.rate_limiting;
        for (field, value) in [
            (
                "rate_limiting.items_requests_per_minute",
                rl.items_requests_per_minute,
            ),
            (
                "rate_limiting.append_requests_per_minute",
                rl.append_requests_per_minute,
            ),
            (
                "rate_limiting.metadata_requests_per_minute",
                rl.metadata_requests_per_minute,
            ),
            (
                "rate_limiting.playlists_requests_per_minute",
                rl.playlists_requests_per_minute,
            ),
        ] {
            positive(&mut errors, field, u64::from(value));
        }

        // --- scheduler ---
        positive(&mut errors, "scheduler.tick_seconds", self.scheduler.tick_seconds);

        // --- actions ---
        if self.actions.file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "actions.file".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        // --- server ---
        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.addr".into(),
                message: format!("not a socket address: {}", self.server.addr),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use plsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .catalog_base_url("http://localhost:9000/v1")
///     .actions_file("/etc/plsync/actions.json")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- catalog ---

    pub fn catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.catalog.base_url = url.into();
        self
    }

    pub fn catalog_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.catalog.user_id = Some(user_id.into());
        self
    }

    pub fn catalog_request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.catalog.request_timeout_secs = secs;
        self
    }

    pub fn catalog_max_retries(mut self, n: u32) -> Self {
        self.config.catalog.max_retries = n;
        self
    }

    pub fn catalog_append_batch_size(mut self, n: usize) -> Self {
        self.config.catalog.append_batch_size = n;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_items_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.items_requests_per_minute = n;
        self
    }

    pub fn rate_limiting_append_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.append_requests_per_minute = n;
        self
    }

    // --- scheduler ---

    pub fn scheduler_tick_seconds(mut self, secs: u64) -> Self {
        self.config.scheduler.tick_seconds = secs;
        self
    }

    pub fn scheduler_run_on_start(mut self, run: bool) -> Self {
        self.config.scheduler.run_on_start = run;
        self
    }

    // --- actions ---

    pub fn actions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.actions.file = path.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- server ---

    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server.addr = addr.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
