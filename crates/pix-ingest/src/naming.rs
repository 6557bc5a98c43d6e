//! Content-addressed filenames and storage keys
//!
//! A stored object is named `<sha256 of bytes>.<extension>` and lives under
//! `<namespace>/<filename>`. Identical bytes always land on the same key, even
//! when they arrive under different external ids; deduplication of records is
//! keyed on the external id, not on the filename.

use pix_common::checksum::content_digest;

use crate::error::{IngestError, IngestResult};

/// Extension used when neither the URL nor the response names one
pub const DEFAULT_EXTENSION: &str = "jpg";

const MAX_EXTENSION_LEN: usize = 8;

fn normalize_extension(candidate: &str) -> Option<String> {
    let valid = !candidate.is_empty()
        && candidate.len() <= MAX_EXTENSION_LEN
        && candidate.bytes().all(|b| b.is_ascii_alphanumeric());
    valid.then(|| candidate.to_ascii_lowercase())
}

/// Normalized form of a configured fallback extension such as `"jpg"` or
/// `".webp"`, or `None` when it could never be used in a filename
pub fn fallback_extension(fallback: &str) -> Option<String> {
    normalize_extension(fallback.trim_start_matches('.'))
}

/// Extension of the last path segment of `source_url`, ignoring query and fragment
pub fn extension_from_url(source_url: &str) -> Option<String> {
    let path = match url::Url::parse(source_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => source_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next()?;
    let (_, suffix) = segment.rsplit_once('.')?;
    normalize_extension(suffix)
}

/// Extension implied by an `image/*` content type
pub fn extension_from_content_type(content_type: &str) -> Option<String> {
    let parsed: mime::Mime = content_type.parse().ok()?;
    if parsed.type_() != mime::IMAGE {
        return None;
    }

    match parsed.subtype().as_str() {
        "jpeg" | "pjpeg" | "jpg" => Some("jpg".to_string()),
        "tiff" => Some("tif".to_string()),
        other => normalize_extension(other),
    }
}

/// Pick the extension for a downloaded payload.
///
/// Order: URL path suffix, then the response content type, then `fallback`.
pub fn resolve_extension(
    source_url: &str,
    content_type: Option<&str>,
    fallback: &str,
) -> IngestResult<String> {
    if let Some(ext) = extension_from_url(source_url) {
        return Ok(ext);
    }
    if let Some(ext) = content_type.and_then(extension_from_content_type) {
        return Ok(ext);
    }
    fallback_extension(fallback).ok_or_else(|| {
        IngestError::InvalidKey(format!(
            "no usable extension for '{}' and fallback '{}' is invalid",
            source_url, fallback
        ))
    })
}

/// `<digest>.<extension>` for the given content
pub fn derive_filename(
    data: &[u8],
    source_url: &str,
    content_type: Option<&str>,
    fallback: &str,
) -> IngestResult<String> {
    let extension = resolve_extension(source_url, content_type, fallback)?;
    Ok(format!("{}.{}", content_digest(data), extension))
}

/// `<namespace>/<filename>`, rejecting inputs that would yield a corrupt key
pub fn storage_key(namespace: &str, filename: &str) -> IngestResult<String> {
    let namespace = namespace.trim();
    if namespace.is_empty() {
        return Err(IngestError::InvalidKey("namespace is empty".to_string()));
    }
    if namespace.contains('/') {
        return Err(IngestError::InvalidKey(format!(
            "namespace '{}' must not contain '/'",
            namespace
        )));
    }
    if filename.is_empty() || filename.contains('/') || filename.starts_with('.') {
        return Err(IngestError::InvalidKey(format!(
            "filename '{}' is not a plain file name",
            filename
        )));
    }

    Ok(format!("{}/{}", namespace, filename))
}
