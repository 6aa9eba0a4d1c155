//! Provider errors
//!
//! Every rejected write maps to one of these variants. Store failures pass
//! through unchanged in [`ProviderError::Store`].

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`crate::MovieProvider`]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Another movie already has this title
    #[error("Movie has a duplicate title: '{title}'")]
    DuplicateTitle { title: String },

    /// The movie failed validation; nothing was written
    #[error("Invalid movie: {reason}")]
    InvalidRecord { reason: String },

    /// The live subscription reported a transport or protocol failure
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// The underlying store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProviderError {
    /// Whether the write was refused by this layer rather than by the store
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ProviderError::DuplicateTitle { .. } | ProviderError::InvalidRecord { .. }
        )
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
