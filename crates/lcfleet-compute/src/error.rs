//! Compute lifecycle error types.

use lcfleet_core::ProviderError;
use thiserror::Error;

/// Errors that can occur while managing nodes and fleets.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("could not launch instances: {0}")]
    Launch(ProviderError),

    #[error("could not terminate instances: {0}")]
    Terminate(ProviderError),

    #[error("could not request fleet: {0}")]
    FleetRequest(ProviderError),

    #[error("could not cancel fleet {id}: {source}")]
    FleetCancel { id: String, source: ProviderError },

    #[error("could not read user-data script {path}: {source}")]
    UserData {
        path: String,
        source: std::io::Error,
    },
}

pub type ComputeResult<T> = Result<T, ComputeError>;
