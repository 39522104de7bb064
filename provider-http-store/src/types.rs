//! Wire types for the object store HTTP API.

use serde::Deserialize;

/// Metadata record the store returns for an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Full object path within the bucket
    pub name: String,

    /// Object size in bytes; the API serializes it as a decimal string
    #[serde(default)]
    pub size: Option<String>,

    /// Object generation marker
    #[serde(default)]
    pub generation: Option<String>,

    /// Recorded MIME type
    #[serde(default)]
    pub content_type: Option<String>,

    /// Comma-separated download tokens; absent until the store has issued
    /// one for the object
    #[serde(default)]
    pub download_tokens: Option<String>,
}

impl ObjectMetadata {
    /// First download token, if any has been issued.
    pub fn first_download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Error payload the store API wraps failures in.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}
