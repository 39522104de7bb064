//! HTTP object store implementation
//!
//! Implements the `ObjectStore` trait over a JSON-speaking object storage
//! HTTP API: one-shot writes, chunked resumable sessions, metadata reads
//! for URL resolution, and deletes.
//!
//! Per the `HttpClient` contract, every request here executes at most once;
//! retry policy lives in the upload engine above this crate.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::identity::IdentityToken;
use bridge_traits::store::{ObjectRef, ObjectStore, PutProgress, PutRequest, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::{HttpStoreError, Result};
use crate::types::{ErrorBody, ObjectMetadata};

/// Bytes per resumable chunk.
const CHUNK_SIZE: usize = 1024 * 1024;

/// Per-request timeout for metadata and control requests.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for requests carrying payload bytes.
const PAYLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Header prefix for custom object metadata.
const META_HEADER_PREFIX: &str = "x-meta-";

/// Header carrying the resumable session URL on session creation.
const SESSION_URL_HEADER: &str = "location";

/// Object store connector over a generic HTTP storage API.
///
/// # Example
///
/// ```ignore
/// use provider_http_store::HttpObjectStore;
///
/// let store = HttpObjectStore::new(http_client, "https://store.example.com/v1", "assets");
/// let reference = store.put(request, Some(&token)).await?;
/// ```
pub struct HttpObjectStore {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// API base URL, without a trailing slash
    base_url: String,

    /// Bucket every object path is rooted in
    bucket: String,
}

impl HttpObjectStore {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    /// URL for writing a new object at `path`.
    fn upload_url(&self, path: &str, resumable: bool) -> String {
        let mut url = format!(
            "{}/b/{}/o?name={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        );
        if resumable {
            url.push_str("&uploadType=resumable");
        }
        url
    }

    /// URL addressing an existing object at `path`.
    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    fn attach_token(request: HttpRequest, token: Option<&IdentityToken>) -> HttpRequest {
        match token {
            Some(token) => request.bearer_token(token.as_str()),
            None => request,
        }
    }

    /// Object metadata headers shared by one-shot and resumable writes.
    fn metadata_headers(mut request: HttpRequest, put: &PutRequest) -> HttpRequest {
        request = request.header("Content-Type", put.content_type.clone());
        if let Some(cache_control) = &put.cache_control {
            request = request.header("Cache-Control", cache_control.clone());
        }
        for (key, value) in &put.custom_metadata {
            request = request.header(format!("{}{}", META_HEADER_PREFIX, key), value.clone());
        }
        request
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.http_client.execute(request).await?)
    }

    /// Extract the API's error message from a failed response body.
    fn api_error(response: &HttpResponse) -> HttpStoreError {
        let message = response
            .json::<ErrorBody>()
            .map(|body| body.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());
        HttpStoreError::Api {
            status_code: response.status,
            message,
        }
    }

    /// Parse a successful write response into an [`ObjectRef`].
    fn object_ref(response: &HttpResponse) -> Result<ObjectRef> {
        let metadata: ObjectMetadata = response
            .json()
            .map_err(|e| HttpStoreError::Parse(e.to_string()))?;
        let size = metadata
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                HttpStoreError::Parse(format!(
                    "object metadata for {} is missing a size",
                    metadata.name
                ))
            })?;

        Ok(ObjectRef {
            path: metadata.name,
            size,
            generation: metadata.generation,
        })
    }

    /// Open a resumable session and return its session URL.
    async fn begin_session(
        &self,
        put: &PutRequest,
        token: Option<&IdentityToken>,
    ) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Post, self.upload_url(&put.path, true))
            .header("X-Upload-Content-Type", put.content_type.clone())
            .header("X-Upload-Content-Length", put.bytes.len().to_string())
            .timeout(CONTROL_TIMEOUT);
        let request = Self::metadata_headers(Self::attach_token(request, token), put);

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response));
        }

        response
            .headers
            .get(SESSION_URL_HEADER)
            .cloned()
            .ok_or_else(|| {
                HttpStoreError::SessionBroken(
                    "store accepted the session but returned no session URL".to_string(),
                )
            })
    }

    async fn put_inner(
        &self,
        put: PutRequest,
        token: Option<&IdentityToken>,
    ) -> Result<ObjectRef> {
        let request = HttpRequest::new(HttpMethod::Post, self.upload_url(&put.path, false))
            .timeout(PAYLOAD_TIMEOUT);
        let request = Self::metadata_headers(Self::attach_token(request, token), &put)
            .body(put.bytes.clone());

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response));
        }

        Self::object_ref(&response)
    }

    async fn put_resumable_inner(
        &self,
        put: PutRequest,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> Result<ObjectRef> {
        let total = put.bytes.len() as u64;
        let session_url = self.begin_session(&put, token).await?;
        debug!(total_bytes = total, "Resumable session opened");

        let mut offset = 0usize;
        let mut final_response = None;

        while offset < put.bytes.len() {
            let end = (offset + CHUNK_SIZE).min(put.bytes.len());
            let request = HttpRequest::new(HttpMethod::Put, session_url.clone())
                .header(
                    "Content-Range",
                    format!("bytes {}-{}/{}", offset, end - 1, total),
                )
                .body(put.bytes.slice(offset..end))
                .timeout(PAYLOAD_TIMEOUT);
            let request = Self::attach_token(request, token);

            let response = self.execute(request).await?;
            match response.status {
                // 308: chunk recorded, session expects more
                308 => {}
                status if (200..300).contains(&status) => {
                    final_response = Some(response);
                }
                _ => return Err(Self::api_error(&response)),
            }

            offset = end;
            // A disinterested listener never fails the transfer.
            let _ = progress
                .send(PutProgress {
                    bytes_transferred: offset as u64,
                    total_bytes: total,
                })
                .await;
        }

        let response = final_response.ok_or_else(|| {
            HttpStoreError::SessionBroken(
                "session consumed every chunk without finalizing the object".to_string(),
            )
        })?;
        Self::object_ref(&response)
    }

    async fn resolve_url_inner(&self, reference: &ObjectRef) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Get, self.object_url(&reference.path))
            .header("Accept", "application/json")
            .timeout(CONTROL_TIMEOUT);

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response));
        }

        let metadata: ObjectMetadata = response
            .json()
            .map_err(|e| HttpStoreError::Parse(e.to_string()))?;

        // The store issues download tokens lazily; absence is transient and
        // surfaces as not-found so the engine's resolution retry covers it.
        let token = metadata.first_download_token().ok_or(HttpStoreError::Api {
            status_code: 404,
            message: "download token not issued yet".to_string(),
        })?;

        Ok(format!(
            "{}?alt=media&token={}",
            self.object_url(&reference.path),
            urlencoding::encode(token)
        ))
    }

    async fn delete_inner(&self, path: &str, token: Option<&IdentityToken>) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Delete, self.object_url(path))
            .timeout(CONTROL_TIMEOUT);
        let request = Self::attach_token(request, token);

        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, request, token), fields(path = %request.path, size = request.bytes.len()))]
    async fn put(
        &self,
        request: PutRequest,
        token: Option<&IdentityToken>,
    ) -> StoreResult<ObjectRef> {
        info!("One-shot object write");
        self.put_inner(request, token).await.map_err(|e| {
            warn!(error = %e, "One-shot write failed");
            e.into()
        })
    }

    #[instrument(skip(self, request, token, progress), fields(path = %request.path, size = request.bytes.len()))]
    async fn put_resumable(
        &self,
        request: PutRequest,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef> {
        info!("Resumable object write");
        self.put_resumable_inner(request, token, progress)
            .await
            .map_err(|e| {
                warn!(error = %e, "Resumable write failed");
                e.into()
            })
    }

    #[instrument(skip(self, reference), fields(path = %reference.path))]
    async fn resolve_url(&self, reference: &ObjectRef) -> StoreResult<String> {
        self.resolve_url_inner(reference).await.map_err(Into::into)
    }

    #[instrument(skip(self, token), fields(path = %path))]
    async fn delete(&self, path: &str, token: Option<&IdentityToken>) -> StoreResult<()> {
        info!("Deleting object");
        self.delete_inner(path, token).await.map_err(Into::into)
    }
}
