//! URL handling module for Sitegrove
//!
//! This module provides dedup-key normalization, seed origin extraction with
//! same-origin filtering, and the pre-flight safety check for seed URLs.

mod normalize;
mod origin;
pub mod safety;

// Re-export main functions
pub use normalize::{normalize_parsed, normalize_url};
pub use origin::SeedOrigin;
pub use safety::SafetyReport;

use ::url::Url;

/// Parses a raw link into an absolute, same-origin URL and its dedup key
///
/// Returns `None` when the link is unparseable, not http(s), or leaves the
/// seed's origin. Callers drop such links silently.
pub fn accept_link(raw: &str, origin: &SeedOrigin) -> Option<(Url, String)> {
    let url = Url::parse(raw.trim()).ok()?;
    if !origin.contains(&url) {
        return None;
    }
    let key = normalize_parsed(&url)?;
    Some((url, key))
}
