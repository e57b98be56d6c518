//! Canonical identity for ad creatives.
//!
//! The same creative is re-served by the CDN on every run with the same
//! path but a freshly signed query string, so identity is taken from the
//! final path segment only, minus its extension. Used for cross-run dedup
//! and as the highlight primary key.

use sha2::{Digest, Sha256};
use url::Url;

/// Length of the hex fallback identity.
const FALLBACK_LEN: usize = 32;

/// Derive the canonical identity of an image reference. Never fails.
pub fn resolve_identity(image_url: &str) -> String {
    let trimmed = image_url.trim();
    let Ok(url) = Url::parse(trimmed) else {
        return fallback_identity(trimmed);
    };

    let filename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    if filename.is_empty() {
        // No filename to key on; fall back to the query-free location.
        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);
        return fallback_identity(base.as_str());
    }

    strip_extension(filename).to_string()
}

fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

fn fallback_identity(raw: &str) -> String {
    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest[..FALLBACK_LEN].to_string()
}

/// Accept either an identity or a full image URL and return the identity.
pub fn identity_of(identity_or_url: &str) -> String {
    let s = identity_or_url.trim();
    if s.contains("://") {
        resolve_identity(s)
    } else {
        s.to_string()
    }
}
