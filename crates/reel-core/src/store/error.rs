//! Store error handling
//!
//! Typed errors for document store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::DocumentKey;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected a write
    #[error("Write to '{key}' rejected: {reason}")]
    Rejected { key: DocumentKey, reason: String },

    /// Document id is not usable as a key
    #[error("Invalid document key: '{0}'")]
    InvalidKey(String),

    /// Document was expected but does not exist
    #[error("Document not found: '{0}'")]
    NotFound(DocumentKey),

    /// Document body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read a persisted store file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a persisted store file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Check if retrying the same request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Unavailable(_) => Some("Check connectivity to the store and try again."),
            StoreError::ReadError { .. } | StoreError::WriteError { .. } => {
                Some("Check that the data directory exists and you have read/write permissions.")
            }
            StoreError::InvalidKey(_) => {
                Some("Documents must be created before they can be updated or deleted.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
