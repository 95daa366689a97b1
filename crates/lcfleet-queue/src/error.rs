//! Work-queue error types.

use lcfleet_core::ProviderError;
use thiserror::Error;

/// Errors that can occur during work-queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("could not create queue {name}: {source}")]
    Create {
        name: String,
        source: ProviderError,
    },

    #[error("could not delete queue {url}: {source}")]
    Delete {
        url: String,
        source: ProviderError,
    },

    #[error("could not enqueue to {url}: {source}")]
    Enqueue {
        url: String,
        source: ProviderError,
    },

    #[error("could not dequeue from {url}: {source}")]
    Dequeue {
        url: String,
        source: ProviderError,
    },

    #[error("could not acknowledge receipt on {url}: {source}")]
    Acknowledge {
        url: String,
        source: ProviderError,
    },

    /// The job descriptor could not be serialized; nothing was submitted.
    #[error("could not encode job descriptor: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;
