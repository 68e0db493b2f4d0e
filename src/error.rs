use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A user-supplied value failed a precondition. Nothing was changed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please select a time")]
    MissingTime,
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("volume must be a number between 0 and 1")]
    InvalidVolume,
    #[error("invalid input '{0}', use format City,Offset (e.g. Paris,+2)")]
    InvalidCity(String),
    #[error("city '{0}' is already listed")]
    DuplicateCity(String),
    #[error("please enter a valid time")]
    InvalidDuration,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored '{key}' is invalid: {message}")]
    Corrupt { key: String, message: String },
    #[error("storage rejected write of '{0}'")]
    Unavailable(String),
}

impl PersistenceError {
    pub(crate) fn corrupt_json(key: &str, err: &serde_json::Error) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            message: format!(
                "invalid JSON at line {}, column {}: {err}",
                err.line(),
                err.column()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
