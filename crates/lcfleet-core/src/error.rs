//! Provider error taxonomy and the soft/hard failure policy.
//!
//! Every backend call can fail in one of two ways that the clients treat
//! differently:
//!
//! - [`ProviderError::Rejected`] — the provider understood the request and
//!   refused it (quota exceeded, malformed image id). Always surfaced to
//!   the caller as a typed error.
//! - everything else — logged with operation context and swallowed into a
//!   sentinel (`Ok(None)` / empty / `false`) under [`FailMode::Soft`], the
//!   default, so one failed call never aborts a long-running orchestration
//!   loop. [`FailMode::Hard`] propagates the original error instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure reported by the underlying provider (object store, queue
/// service, or compute service).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider explicitly refused the request.
    #[error("provider rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The named entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider could not be reached or answered unintelligibly.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Rejections bypass the soft-fail policy.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Whether a client converts provider failures into sentinels or raises
/// them to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Log the failure and return a sentinel value. The default.
    #[default]
    Soft,
    /// Propagate the underlying failure to the caller unmodified.
    Hard,
}

impl FailMode {
    pub fn is_hard(self) -> bool {
        self == Self::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_always_typed() {
        let err = ProviderError::rejected("MaxSpotFleetRequestCountExceeded", "quota");
        assert!(err.is_rejection());
        assert!(!ProviderError::NotFound("b/k".into()).is_rejection());
        assert!(!ProviderError::Unavailable("timeout".into()).is_rejection());
    }

    #[test]
    fn soft_is_the_default() {
        assert_eq!(FailMode::default(), FailMode::Soft);
        assert!(!FailMode::Soft.is_hard());
        assert!(FailMode::Hard.is_hard());
    }
}
