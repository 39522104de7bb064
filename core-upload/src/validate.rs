//! Pre-flight asset validation.
//!
//! Runs before any network activity; a rejection here short-circuits the
//! entire pipeline and the store's `put` is never invoked.

use crate::error::ValidationError;
use crate::request::UploadRequest;
use core_runtime::config::UploadConfig;
use tracing::debug;

/// Reject unsuitable input before any network call.
///
/// Checks, in order: declared content type against the allow-list, size
/// bounds, and finally that the payload's leading bytes actually look like
/// the declared type.
pub fn validate(request: &UploadRequest, config: &UploadConfig) -> Result<(), ValidationError> {
    let content_type = request.content_type();

    if !config
        .accepted_types
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(content_type))
    {
        return Err(ValidationError::InvalidType(content_type.to_string()));
    }

    let size = request.size_bytes();
    if size < config.min_asset_bytes {
        return Err(ValidationError::TooSmall {
            size,
            limit: config.min_asset_bytes,
        });
    }
    if size > config.max_asset_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: config.max_asset_bytes,
        });
    }

    if !signature_matches(content_type, request.bytes()) {
        return Err(ValidationError::Corrupted {
            declared: content_type.to_string(),
        });
    }

    debug!(
        size_bytes = size,
        content_type, "Asset passed pre-flight validation"
    );
    Ok(())
}

/// Check the payload's magic bytes against the declared type.
///
/// Unknown-but-allowed types pass; the allow-list is the gatekeeper for
/// which types exist, this only catches payloads lying about themselves.
fn signature_matches(content_type: &str, bytes: &[u8]) -> bool {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
        "image/webp" => {
            bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP"
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn png_payload(size: usize) -> Bytes {
        let mut data = vec![0u8; size.max(8)];
        data[..8].copy_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        Bytes::from(data)
    }

    fn request(bytes: Bytes, content_type: &str) -> UploadRequest {
        UploadRequest::new(bytes, content_type, "covers", "test")
    }

    #[test]
    fn test_accepts_valid_png() {
        let config = UploadConfig::default();
        let req = request(png_payload(2048), "image/png");
        assert!(validate(&req, &config).is_ok());
    }

    #[test]
    fn test_rejects_disallowed_type() {
        let config = UploadConfig::default();
        let req = request(png_payload(2048), "image/tiff");
        assert_eq!(
            validate(&req, &config),
            Err(ValidationError::InvalidType("image/tiff".to_string()))
        );
    }

    #[test]
    fn test_rejects_too_small() {
        let config = UploadConfig::default();
        let req = request(png_payload(512), "image/png");
        assert!(matches!(
            validate(&req, &config),
            Err(ValidationError::TooSmall { size: 512, .. })
        ));
    }

    #[test]
    fn test_rejects_too_large() {
        let config = UploadConfig::default();
        let req = request(png_payload(16 * 1024 * 1024), "image/png");
        assert!(matches!(
            validate(&req, &config),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_signature() {
        let config = UploadConfig::default();
        // JPEG magic bytes declared as PNG
        let mut data = vec![0u8; 2048];
        data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        let req = request(Bytes::from(data), "image/png");
        assert!(matches!(
            validate(&req, &config),
            Err(ValidationError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_accepts_jpeg_and_webp_signatures() {
        let config = UploadConfig::default();

        let mut jpeg = vec![0u8; 2048];
        jpeg[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        assert!(validate(&request(Bytes::from(jpeg), "image/jpeg"), &config).is_ok());

        let mut webp = vec![0u8; 2048];
        webp[..4].copy_from_slice(b"RIFF");
        webp[8..12].copy_from_slice(b"WEBP");
        assert!(validate(&request(Bytes::from(webp), "image/webp"), &config).is_ok());
    }

    #[test]
    fn test_type_check_runs_before_size_check() {
        // An oversized asset of a disallowed type reports the type problem.
        let config = UploadConfig::default();
        let req = request(png_payload(16 * 1024 * 1024), "application/pdf");
        assert!(matches!(
            validate(&req, &config),
            Err(ValidationError::InvalidType(_))
        ));
    }
}
