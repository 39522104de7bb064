//! Error taxonomy for the upload engine.
//!
//! Three layers, matching how failures propagate:
//! - [`ValidationError`] aborts before any network call
//! - [`TransferError`] describes one failed attempt; the retry layer
//!   classifies it, the chain decides whether to fall back
//! - [`ChainExhaustedError`] surfaces only when every strategy's retry
//!   budget is spent, carrying the full attempt history
//!
//! No failure is process-fatal; every failure is recoverable by re-invoking
//! the upload.

use crate::chain::StrategyAttempt;
use std::time::Duration;
use thiserror::Error;

/// Pre-flight rejection. Raised before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content type {0} is not an accepted image type")]
    InvalidType(String),

    #[error("asset is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("asset is {size} bytes, below the {limit} byte minimum")]
    TooSmall { size: u64, limit: u64 },

    #[error("asset bytes do not look like the declared content type {declared}")]
    Corrupted { declared: String },
}

/// Failure of one transfer attempt.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    #[error("no transfer progress within the {0:?} stall window")]
    Stalled(Duration),

    #[error("attempt exceeded its {0:?} ceiling")]
    TimedOut(Duration),

    #[error("upload cancelled")]
    Cancelled,

    #[error("credentials lack permission: {0}")]
    Unauthorized(String),

    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("store rejected the request: {0}")]
    InvalidArgument(String),

    #[error("uploaded object could not be located: {0}")]
    NotFound(String),

    #[error("stored object is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Unknown(String),
}

impl From<bridge_traits::store::StoreError> for TransferError {
    fn from(e: bridge_traits::store::StoreError) -> Self {
        use bridge_traits::store::StoreError;
        match e {
            StoreError::Network(m) => Self::Network(m),
            StoreError::Unavailable(m) => Self::Unavailable(m),
            StoreError::Unauthorized(m) => Self::Unauthorized(m),
            StoreError::Unauthenticated(m) => Self::Unauthenticated(m),
            StoreError::QuotaExceeded(m) => Self::QuotaExceeded(m),
            StoreError::InvalidArgument(m) => Self::InvalidArgument(m),
            StoreError::NotFound(m) => Self::NotFound(m),
            StoreError::Unknown(m) => Self::Unknown(m),
        }
    }
}

/// Every strategy's retry budget is spent.
///
/// Carries the ordered attempt history for diagnostics, plus remediation
/// hints derived from the failure mix.
#[derive(Error, Debug)]
#[error("upload failed, all strategies exhausted after {} attempts", attempts.len())]
pub struct ChainExhaustedError {
    pub attempts: Vec<StrategyAttempt>,
}

impl ChainExhaustedError {
    /// Actionable hints derived from the recorded failures.
    pub fn remediation_hints(&self) -> Vec<&'static str> {
        use crate::chain::AttemptOutcome;

        let mut hints = Vec::new();
        let errors = self.attempts.iter().filter_map(|a| match &a.outcome {
            AttemptOutcome::Failed(e) => Some(e),
            AttemptOutcome::Succeeded => None,
        });

        let mut network = false;
        let mut auth = false;
        let mut quota = false;
        let mut slow = false;
        for error in errors {
            match error {
                TransferError::Network(_) | TransferError::Unavailable(_) => network = true,
                TransferError::Unauthorized(_) | TransferError::Unauthenticated(_) => auth = true,
                TransferError::QuotaExceeded(_) => quota = true,
                TransferError::Stalled(_) | TransferError::TimedOut(_) => slow = true,
                _ => {}
            }
        }

        if network {
            hints.push("check network connectivity");
        }
        if auth {
            hints.push("re-authenticate, or check the storage write policy");
        }
        if quota {
            hints.push("free storage quota before retrying");
        }
        if slow {
            hints.push("retry with a smaller asset or a better connection");
        }
        hints.push("retry the upload; the failure is not permanent");
        hints
    }
}

/// Public failure surface of `UploadAsset`.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ChainExhausted(#[from] ChainExhaustedError),

    #[error("upload cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AttemptOutcome;
    use crate::strategy::StrategyId;
    use chrono::Utc;

    fn failed_attempt(error: TransferError) -> StrategyAttempt {
        StrategyAttempt {
            strategy_id: StrategyId::Resumable,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            outcome: AttemptOutcome::Failed(error),
        }
    }

    #[test]
    fn test_store_error_mapping() {
        let err: TransferError =
            bridge_traits::store::StoreError::QuotaExceeded("full".to_string()).into();
        assert!(matches!(err, TransferError::QuotaExceeded(_)));
    }

    #[test]
    fn test_hints_reflect_failure_mix() {
        let exhausted = ChainExhaustedError {
            attempts: vec![
                failed_attempt(TransferError::Stalled(Duration::from_secs(60))),
                failed_attempt(TransferError::Unauthenticated("no token".to_string())),
            ],
        };

        let hints = exhausted.remediation_hints();
        assert!(hints.contains(&"re-authenticate, or check the storage write policy"));
        assert!(hints.contains(&"retry with a smaller asset or a better connection"));
        assert!(hints.contains(&"retry the upload; the failure is not permanent"));
        assert!(!hints.contains(&"check network connectivity"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::TooLarge {
            size: 20_000_000,
            limit: 15_728_640,
        };
        assert!(err.to_string().contains("20000000"));
    }
}
