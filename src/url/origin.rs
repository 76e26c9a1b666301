use crate::url::normalize::normalize_parsed;
use crate::{UrlError, UrlResult};
use url::{Origin, Url};

/// The seed of a crawl together with the origin every crawled page must share
///
/// Same-origin means equal scheme, host and port. Subdomains are different
/// origins.
#[derive(Debug, Clone)]
pub struct SeedOrigin {
    seed: Url,
    seed_key: String,
    origin: Origin,
    base: String,
}

impl SeedOrigin {
    /// Parses a seed URL and derives its origin
    ///
    /// # Errors
    ///
    /// * `UrlError::Parse` - The seed is not an absolute URL
    /// * `UrlError::InvalidScheme` - The scheme is not http or https
    /// * `UrlError::MissingHost` - The URL has no host
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let seed = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(UrlError::InvalidScheme(seed.scheme().to_string()));
        }

        let seed_key = normalize_parsed(&seed).ok_or(UrlError::MissingHost)?;
        let origin = seed.origin();
        let base = origin.ascii_serialization();

        Ok(Self {
            seed,
            seed_key,
            origin,
            base,
        })
    }

    /// The seed URL as given (query and fragment preserved)
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Normalized key of the seed
    pub fn seed_key(&self) -> &str {
        &self.seed_key
    }

    /// Serialized origin, e.g. `https://example.com` or `http://127.0.0.1:8080`
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Returns true if `url` belongs to the seed's origin
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }
}
