//! Action file loading and validation
//!
//! The action file is a JSON document of the form
//! `{ "actions": [ { "type": "sync", ... }, ... ] }`. Loading fails fast on
//! the first bad record; validation walks the whole document and reports
//! every problem with its `actions[i]` position.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde_json::{json, Value};

use crate::domain::{Action, DomainError};

/// A problem found in the action document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionValidationError {
    /// Position of the offending record, `None` for document-level problems
    pub index: Option<usize>,
    pub message: String,
}

impl ActionValidationError {
    fn document(message: impl Into<String>) -> Self {
        Self {
            index: None,
            message: message.into(),
        }
    }

    fn record(index: usize, err: &DomainError) -> Self {
        let message = match err {
            DomainError::UnknownActionKind(kind) => format!("unknown action type '{kind}'"),
            DomainError::InvalidAction(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            index: Some(index),
            message,
        }
    }
}

impl fmt::Display for ActionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "actions[{i}]: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ActionValidationError {}

/// An empty action document
pub fn empty_document() -> Value {
    json!({ "actions": [] })
}

/// Read the action document as raw JSON without validating its records
pub fn load_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read action file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Action file {} is not valid JSON", path.display()))?;
    Ok(value)
}

/// Like [`load_document`], but a missing file reads as an empty document
pub fn load_document_or_empty(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        return Ok(empty_document());
    }
    load_document(path)
}

/// Write the action document as pretty-printed JSON, creating parent directories
pub fn save_document(path: &Path, document: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let content = serde_json::to_string_pretty(document)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write action file {}", path.display()))?;
    Ok(())
}

/// Parse every record of a document, stopping at the first invalid one
pub fn parse_actions(document: &Value) -> Result<Vec<Action>, ActionValidationError> {
    let records = action_records(document)?;
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            Action::from_value(record).map_err(|e| ActionValidationError::record(i, &e))
        })
        .collect()
}

/// Load and parse the action file at `path`.
///
/// # Errors
///
/// Fails on I/O or JSON errors, and on the first record that is not a valid
/// action.
pub fn load_actions(path: &Path) -> anyhow::Result<Vec<Action>> {
    let document = load_document(path)?;
    let actions = parse_actions(&document)
        .with_context(|| format!("Invalid action file {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = actions.len(), "Loaded actions");
    Ok(actions)
}

/// Check the whole document and collect every problem found.
///
/// An empty vector means every record would load.
pub fn validate_document(document: &Value) -> Vec<ActionValidationError> {
    let records = match action_records(document) {
        Ok(records) => records,
        Err(e) => return vec![e],
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            Action::from_value(record)
                .err()
                .map(|e| ActionValidationError::record(i, &e))
        })
        .collect()
}

fn action_records(document: &Value) -> Result<&Vec<Value>, ActionValidationError> {
    let obj = document
        .as_object()
        .ok_or_else(|| ActionValidationError::document("document must be a JSON object"))?;
    match obj.get("actions") {
        Some(Value::Array(records)) => Ok(records),
        Some(_) => Err(ActionValidationError::document("'actions' must be a list")),
        None => Err(ActionValidationError::document("missing 'actions' list")),
    }
}
