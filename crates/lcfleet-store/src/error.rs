//! Object-store error types.

use lcfleet_core::ProviderError;
use thiserror::Error;

/// Errors that can occur during object-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: store://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("could not fetch store://{bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        source: ProviderError,
    },

    #[error("could not upload {path} to bucket {bucket}: {source}")]
    Upload {
        path: String,
        bucket: String,
        source: ProviderError,
    },

    #[error("could not delete store://{bucket}/{key}: {source}")]
    Delete {
        bucket: String,
        key: String,
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type StoreResult<T> = Result<T, StoreError>;
