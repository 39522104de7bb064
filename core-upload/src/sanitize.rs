//! Destination path construction.
//!
//! Turns an arbitrary caller-supplied display name into a deterministic,
//! collision-resistant object path. The timestamp and random suffix are
//! computed once per upload session and reused by every strategy in the
//! chain, so a later strategy never collides with an earlier strategy's
//! partial object at the same path.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Maximum length of the sanitized stem, before suffixes.
const MAX_STEM_LEN: usize = 50;

/// Length of the random collision suffix.
const SUFFIX_LEN: usize = 6;

/// Fallback stem when sanitization strips everything.
const DEFAULT_STEM: &str = "asset";

/// A fully determined destination name for one upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    stem: String,
    timestamp: i64,
    suffix: String,
    extension: String,
}

impl ObjectName {
    /// Derive a name from the caller's display name and content type.
    ///
    /// The timestamp is fixed at derivation and the suffix drawn once; both
    /// are then stable for the lifetime of the session.
    pub fn derive(display_name: &str, content_type: &str, now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();

        Self::with_parts(display_name, content_type, now.timestamp(), suffix)
    }

    /// Deterministic constructor; `derive` feeds it, tests call it directly.
    pub fn with_parts(
        display_name: &str,
        content_type: &str,
        timestamp: i64,
        suffix: String,
    ) -> Self {
        Self {
            stem: sanitize_stem(display_name),
            timestamp,
            suffix,
            extension: extension_for(content_type, display_name),
        }
    }

    /// Full object path under `folder`.
    pub fn path(&self, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            self.file_name()
        } else {
            format!("{}/{}", folder, self.file_name())
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            self.stem, self.timestamp, self.suffix, self.extension
        )
    }
}

/// Deterministic stem transform: lowercase, strip to alphanumerics plus
/// hyphen/underscore, collapse separator runs, trim separators, truncate.
fn sanitize_stem(display_name: &str) -> String {
    let mut stem = String::with_capacity(display_name.len().min(MAX_STEM_LEN));
    let mut last_was_separator = true; // trims leading separators

    for ch in display_name.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            stem.push(ch);
            last_was_separator = false;
        } else if (ch == '-' || ch == '_') && !last_was_separator {
            stem.push(ch);
            last_was_separator = true;
        }
        if stem.len() >= MAX_STEM_LEN {
            break;
        }
    }

    while stem.ends_with('-') || stem.ends_with('_') {
        stem.pop();
    }

    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem
    }
}

/// File extension for the stored object.
///
/// The declared content type wins; an extension on the display name is the
/// fallback for allow-listed-but-unmapped types.
fn extension_for(content_type: &str, display_name: &str) -> String {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/webp" => "webp".to_string(),
        _ => display_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_lowercases_and_strips() {
        assert_eq!(sanitize_stem("Sunset Photo (final)!.PNG"), "sunsetphotofinalpng");
    }

    #[test]
    fn test_stem_collapses_separator_runs() {
        assert_eq!(sanitize_stem("a--__--b"), "a-b");
        assert_eq!(sanitize_stem("a__b"), "a_b");
    }

    #[test]
    fn test_stem_trims_separators() {
        assert_eq!(sanitize_stem("--hello--"), "hello");
        assert_eq!(sanitize_stem("__x__"), "x");
    }

    #[test]
    fn test_stem_truncates_to_fifty() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_stem(&long).len(), 50);
    }

    #[test]
    fn test_empty_stem_falls_back() {
        assert_eq!(sanitize_stem("!!!"), "asset");
        assert_eq!(sanitize_stem(""), "asset");
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(extension_for("image/jpeg", "x.jpeg"), "jpg");
        assert_eq!(extension_for("image/png", "whatever"), "png");
        assert_eq!(extension_for("image/webp", "y"), "webp");
    }

    #[test]
    fn test_extension_fallback_from_display_name() {
        assert_eq!(extension_for("image/x-unknown", "photo.GIF"), "gif");
        assert_eq!(extension_for("image/x-unknown", "noext"), "bin");
    }

    #[test]
    fn test_path_construction() {
        let name = ObjectName::with_parts(
            "Sunset Photo",
            "image/png",
            1_700_000_000,
            "x4k2jq".to_string(),
        );
        assert_eq!(
            name.path("covers"),
            "covers/sunsetphoto-1700000000-x4k2jq.png"
        );
        assert_eq!(name.path("/covers/"), "covers/sunsetphoto-1700000000-x4k2jq.png");
        assert_eq!(name.path(""), "sunsetphoto-1700000000-x4k2jq.png");
    }

    #[test]
    fn test_derive_is_stable_once_created() {
        let now = Utc::now();
        let name = ObjectName::derive("My File", "image/jpeg", now);
        // The same ObjectName renders the same path every time it is asked.
        assert_eq!(name.path("covers"), name.path("covers"));
    }

    #[test]
    fn test_derived_suffix_is_lowercase_alphanumeric() {
        let name = ObjectName::derive("x", "image/png", Utc::now());
        let file_name = name.file_name();
        let suffix = file_name
            .rsplit('-')
            .next()
            .unwrap()
            .trim_end_matches(".png");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
