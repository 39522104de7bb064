//! The caller's upload request.

use bytes::Bytes;

/// One asset to upload, immutable once validated.
///
/// The request owns its payload and is consumed by the call that created it;
/// nothing about it changes between strategies or retries.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    bytes: Bytes,
    content_type: String,
    destination_folder: String,
    display_name: String,
}

impl UploadRequest {
    pub fn new(
        bytes: Bytes,
        content_type: impl Into<String>,
        destination_folder: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            destination_folder: destination_folder.into(),
            display_name: display_name.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared MIME type, e.g. `image/png`
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn destination_folder(&self) -> &str {
        &self.destination_folder
    }

    /// Caller-supplied display name; sanitized before it touches a path
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// A request plus its fully determined destination path.
///
/// Built once per upload session, after validation and name derivation, and
/// shared by every strategy in the chain so no strategy can collide with
/// another's partial object.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub request: UploadRequest,
    pub path: String,
}
