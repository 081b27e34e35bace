//! Request key generation for cache entries.

use sha2::{Digest, Sha256};
use url::Url;

/// Normalize a request URL for use as a cache key.
///
/// The fragment never reaches the network, so it is dropped. The query
/// string is kept as-is (not reordered).
pub fn cache_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.into()
}

/// Compute the key of a cache entry from the request method and URL.
///
/// The request body is not part of the key.
pub fn compute_cache_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(cache_url(url).as_bytes());
    hex::encode(hasher.finalize())
}
