//! Action file storage
//!
//! Every mutation loads the current document, applies the change, validates
//! the whole result and only then writes it back. An invalid result leaves
//! the file untouched. A missing file reads as `{"actions": []}`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use plsync_core::action_file::{
    load_document_or_empty, save_document, validate_document, ActionValidationError,
};

/// Errors returned by [`ActionStore`] mutations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record at this position
    #[error("index {index} out of range ({len} actions)")]
    OutOfRange { index: usize, len: usize },

    /// The document would not validate after the change
    #[error("validation failed: {} problem(s)", .0.len())]
    Invalid(Vec<ActionValidationError>),

    /// Reading or writing the file failed
    #[error("{0:#}")]
    Io(anyhow::Error),
}

/// Read-modify-write access to one action file
///
/// Mutations are serialized through an async mutex so concurrent requests
/// never interleave their load and save.
pub struct ActionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ActionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document; `{"actions": []}` when the file does not exist
    pub fn load(&self) -> Result<Value, StoreError> {
        load_document_or_empty(&self.path).map_err(StoreError::Io)
    }

    /// Every problem in the current document; empty when it is valid
    pub fn validate(&self) -> Result<Vec<ActionValidationError>, StoreError> {
        Ok(validate_document(&self.load()?))
    }

    /// Appends `record` as the last action
    ///
    /// # Returns
    /// The index of the new record
    ///
    /// # Errors
    /// [`StoreError::Invalid`] if the resulting document does not validate
    pub async fn append(&self, record: Value) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load()?;

        let index = {
            let records = records_mut(&mut document)?;
            records.push(record);
            records.len() - 1
        };

        self.commit(&document)?;
        info!(index, file = %self.path.display(), "Added action");
        Ok(index)
    }

    /// Replaces the action at `index` with `record`
    ///
    /// # Errors
    /// - [`StoreError::OutOfRange`] if there is no action at `index`
    /// - [`StoreError::Invalid`] if the resulting document does not validate
    pub async fn replace(&self, index: usize, record: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load()?;

        {
            let records = records_mut(&mut document)?;
            let len = records.len();
            let slot = records
                .get_mut(index)
                .ok_or(StoreError::OutOfRange { index, len })?;
            *slot = record;
        }

        self.commit(&document)?;
        info!(index, file = %self.path.display(), "Replaced action");
        Ok(())
    }

    fn commit(&self, document: &Value) -> Result<(), StoreError> {
        let errors = validate_document(document);
        if !errors.is_empty() {
            return Err(StoreError::Invalid(errors));
        }
        save_document(&self.path, document).map_err(StoreError::Io)
    }
}

/// The `actions` list, created when the key is missing
fn records_mut(document: &mut Value) -> Result<&mut Vec<Value>, StoreError> {
    let invalid = StoreError::Invalid(validate_document(document));
    let Some(obj) = document.as_object_mut() else {
        return Err(invalid);
    };
    match obj
        .entry("actions")
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(records) => Ok(records),
        _ => Err(invalid),
    }
}
