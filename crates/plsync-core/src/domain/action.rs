//! Configured reconciliation actions
//!
//! An [`Action`] is a closed set: a record naming any kind other than `sync`
//! or `archive` is rejected when it is parsed and never reaches the
//! dispatcher.
//!
//! Records use the field names of the action file:
//!
//! ```json
//! {
//!   "type": "archive",
//!   "source_playlist_id": "37i9dQZF1DXcBWIGoYBM5M",
//!   "filter_by_time": true,
//!   "timeBetweenActInSeconds": 3600
//! }
//! ```

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::newtypes::PlaylistId;

/// Recurrence interval applied when a record does not give one
pub const DEFAULT_INTERVAL_SECONDS: u64 = 360;

/// Longest accepted recurrence interval (one year)
pub const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_true() -> bool {
    true
}

/// Kind discriminator of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Sync,
    Archive,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Sync => "sync",
            ActionKind::Archive => "archive",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Make the target contain every track of the source (additive only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncAction {
    pub source_playlist_id: PlaylistId,
    pub target_playlist_id: PlaylistId,
    #[serde(default = "default_true")]
    pub avoid_duplicates: bool,
    #[serde(
        rename = "timeBetweenActInSeconds",
        alias = "interval_seconds",
        default = "default_interval"
    )]
    pub interval_seconds: u64,
}

/// Copy source tracks into a destination playlist, at most once each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveAction {
    pub source_playlist_id: PlaylistId,
    /// Explicit destination; resolved by name from the source when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_playlist_id: Option<PlaylistId>,
    #[serde(default = "default_true")]
    pub avoid_duplicates: bool,
    #[serde(default)]
    pub filter_by_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_seconds: Option<u64>,
    #[serde(
        rename = "timeBetweenActInSeconds",
        alias = "interval_seconds",
        default = "default_interval"
    )]
    pub interval_seconds: u64,
}

impl ArchiveAction {
    /// Recency window in seconds, or `None` when time filtering is off.
    ///
    /// Without an explicit `time_window_seconds` the window is the action's
    /// own recurrence interval, i.e. "what was added since the last run".
    pub fn effective_window(&self) -> Option<u64> {
        if !self.filter_by_time {
            return None;
        }
        Some(self.time_window_seconds.unwrap_or(self.interval_seconds))
    }
}

/// A configured unit of recurring work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Sync(SyncAction),
    Archive(ArchiveAction),
}

impl Action {
    /// Parse one action record.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidAction`] if the record is not an object, has no
    ///   string `type`, its parameters are missing, ill-typed or unknown, or
    ///   its interval is outside `1..=MAX_INTERVAL_SECONDS`
    /// - [`DomainError::UnknownActionKind`] if `type` is neither `sync` nor
    ///   `archive`
    pub fn from_value(value: &Value) -> Result<Self, DomainError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DomainError::InvalidAction("action is not an object".to_string()))?;

        let kind = match obj.get("type") {
            None => {
                return Err(DomainError::InvalidAction(
                    "missing 'type' field".to_string(),
                ))
            }
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => {
                return Err(DomainError::InvalidAction(format!(
                    "'type' must be a string, got {other}"
                )))
            }
        };

        let mut params = obj.clone();
        params.remove("type");
        let params = Value::Object(params);

        let action = match kind {
            "sync" => serde_json::from_value::<SyncAction>(params)
                .map(Action::Sync)
                .map_err(|e| DomainError::InvalidAction(format!("invalid sync parameters: {e}")))?,
            "archive" => serde_json::from_value::<ArchiveAction>(params)
                .map(Action::Archive)
                .map_err(|e| {
                    DomainError::InvalidAction(format!("invalid archive parameters: {e}"))
                })?,
            other => return Err(DomainError::UnknownActionKind(other.to_string())),
        };

        let interval = action.interval_seconds();
        if interval == 0 {
            return Err(DomainError::InvalidAction(
                "timeBetweenActInSeconds must be greater than 0".to_string(),
            ));
        }
        if interval > MAX_INTERVAL_SECONDS {
            return Err(DomainError::InvalidAction(format!(
                "timeBetweenActInSeconds must be at most {MAX_INTERVAL_SECONDS}, got {interval}"
            )));
        }

        Ok(action)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Sync(_) => ActionKind::Sync,
            Action::Archive(_) => ActionKind::Archive,
        }
    }

    pub fn source(&self) -> &PlaylistId {
        match self {
            Action::Sync(a) => &a.source_playlist_id,
            Action::Archive(a) => &a.source_playlist_id,
        }
    }

    /// Explicit destination, if the record names one
    pub fn target(&self) -> Option<&PlaylistId> {
        match self {
            Action::Sync(a) => Some(&a.target_playlist_id),
            Action::Archive(a) => a.target_playlist_id.as_ref(),
        }
    }

    pub fn interval_seconds(&self) -> u64 {
        match self {
            Action::Sync(a) => a.interval_seconds,
            Action::Archive(a) => a.interval_seconds,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Action::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Value> for Action {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Action::from_value(&value)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} {} -> {}", self.kind(), self.source(), target),
            None => write!(f, "{} {} -> (by name)", self.kind(), self.source()),
        }
    }
}
