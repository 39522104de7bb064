//! Remote Object Store Abstraction
//!
//! The destination of every upload. Implementations wrap a concrete storage
//! provider's API (see `provider-http-store`); tests script the trait
//! directly.
//!
//! A `put_resumable` call streams progress events through an mpsc sender
//! while the transfer runs; the terminal outcome is the function's return
//! value, never an event. One-shot `put` reports nothing until it resolves.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::identity::IdentityToken;

/// Errors surfaced by object store implementations.
///
/// The variants mirror the failure classes the upload engine reasons about;
/// provider crates are responsible for folding raw statuses into them.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected, credentials lack permission: {0}")]
    Unauthorized(String),

    #[error("write rejected, authentication required: {0}")]
    Unauthenticated(String),

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("store rejected the request: {0}")]
    InvalidArgument(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Unknown(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One object write, fully described.
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Destination path within the store, e.g. `covers/sunset-172-x4k2jq.png`
    pub path: String,
    /// The asset payload
    pub bytes: Bytes,
    /// MIME type recorded on the stored object
    pub content_type: String,
    /// Cache-Control header value for the stored object, if any
    pub cache_control: Option<String>,
    /// Provider-specific custom metadata recorded alongside the object
    pub custom_metadata: HashMap<String, String>,
}

/// A progress event emitted by a resumable put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

/// Handle to a stored object, returned on successful put.
///
/// The handle is how the store identifies the object for URL resolution;
/// callers treat it as opaque apart from the recorded size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Path of the stored object
    pub path: String,
    /// Size the store recorded for the object, in bytes
    pub size: u64,
    /// Provider generation/version marker, if the store exposes one
    pub generation: Option<String>,
}

/// Remote object storage trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object in a single shot. No intermediate progress.
    async fn put(
        &self,
        request: PutRequest,
        token: Option<&IdentityToken>,
    ) -> StoreResult<ObjectRef>;

    /// Write an object through a resumable session, emitting [`PutProgress`]
    /// events on `progress` as bytes land.
    ///
    /// Implementations must emit monotonically non-decreasing
    /// `bytes_transferred` values and stop emitting once the call resolves.
    async fn put_resumable(
        &self,
        request: PutRequest,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef>;

    /// Resolve the durable, publicly fetchable URL for a stored object.
    ///
    /// URL materialization may lag object visibility; callers retry.
    async fn resolve_url(&self, reference: &ObjectRef) -> StoreResult<String>;

    /// Delete an object. Used by callers cleaning up, never by the upload
    /// engine itself.
    async fn delete(&self, path: &str, token: Option<&IdentityToken>) -> StoreResult<()>;
}
