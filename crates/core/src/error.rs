use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DriverError;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("selector key '{0}' is not mapped")]
    UnknownSelector(String),

    #[error("invalid selector definition for '{key}': {reason}")]
    InvalidSelector { key: String, reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("failed to read non-empty text from '{selector}' after {attempts} attempts")]
    FieldUnavailable { selector: String, attempts: usize },

    #[error("target post {target} not found after {attempts} scrolls")]
    SlotNotFound { target: String, attempts: usize },

    #[error("permalink not found in post at slot {slot}")]
    PermalinkMissing { slot: usize },

    #[error("page failed to load within {0:?}")]
    PageLoadTimeout(std::time::Duration),

    #[error("retry screen still visible after {attempts} recovery attempts")]
    InterstitialExhausted { attempts: usize },

    #[error("no new posts after {0} scroll attempts")]
    FeedStalled(usize),

    #[error("cache file {} is not a JSON array of records: {reason}", path.display())]
    MalformedCache { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarvestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarvestError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends the whole run rather than a single record.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(self, HarvestError::FieldUnavailable { .. })
    }
}
