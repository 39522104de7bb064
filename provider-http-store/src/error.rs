//! Error types for the HTTP object store provider.

use bridge_traits::error::BridgeError;
use bridge_traits::store::StoreError;
use thiserror::Error;

/// HTTP object store provider errors
#[derive(Error, Debug)]
pub enum HttpStoreError {
    /// The store API answered with a non-success status
    #[error("store API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// Failed to parse an API response
    #[error("failed to parse store response: {0}")]
    Parse(String),

    /// The resumable session could not be opened or went missing mid-upload
    #[error("resumable session broken: {0}")]
    SessionBroken(String),

    /// Transport-level failure below the API
    #[error(transparent)]
    Transport(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, HttpStoreError>;

/// Fold provider errors into the failure classes the upload engine reasons
/// about. This is the single place raw statuses become semantics.
impl From<HttpStoreError> for StoreError {
    fn from(error: HttpStoreError) -> Self {
        match error {
            HttpStoreError::Api {
                status_code,
                message,
            } => {
                let message = format!("status {}: {}", status_code, message);
                match status_code {
                    400 => StoreError::InvalidArgument(message),
                    401 => StoreError::Unauthenticated(message),
                    403 => StoreError::Unauthorized(message),
                    404 => StoreError::NotFound(message),
                    429 => StoreError::QuotaExceeded(message),
                    500..=599 => StoreError::Unavailable(message),
                    _ => StoreError::Unknown(message),
                }
            }
            HttpStoreError::Parse(msg) => StoreError::Unknown(msg),
            // A broken session is a store-side hiccup; retrying the attempt
            // opens a fresh session.
            HttpStoreError::SessionBroken(msg) => StoreError::Unavailable(msg),
            HttpStoreError::Transport(e) => StoreError::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HttpStoreError::Api {
            status_code: 404,
            message: "object not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "store API error (status 404): object not found"
        );
    }

    #[test]
    fn test_status_folding() {
        let cases: Vec<(u16, fn(&StoreError) -> bool)> = vec![
            (400, |e| matches!(e, StoreError::InvalidArgument(_))),
            (401, |e| matches!(e, StoreError::Unauthenticated(_))),
            (403, |e| matches!(e, StoreError::Unauthorized(_))),
            (404, |e| matches!(e, StoreError::NotFound(_))),
            (429, |e| matches!(e, StoreError::QuotaExceeded(_))),
            (500, |e| matches!(e, StoreError::Unavailable(_))),
            (503, |e| matches!(e, StoreError::Unavailable(_))),
            (418, |e| matches!(e, StoreError::Unknown(_))),
        ];

        for (status, check) in cases {
            let folded: StoreError = HttpStoreError::Api {
                status_code: status,
                message: "x".to_string(),
            }
            .into();
            assert!(check(&folded), "status {} folded to {:?}", status, folded);
        }
    }

    #[test]
    fn test_transport_folds_to_network() {
        let folded: StoreError =
            HttpStoreError::Transport(BridgeError::Timeout("30s elapsed".to_string())).into();
        assert!(matches!(folded, StoreError::Network(_)));
    }
}
