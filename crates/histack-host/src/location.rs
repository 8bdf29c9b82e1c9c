//! Location helpers
//!
//! The stack tracks locations as the page-relative part of a URL
//! (path, query and fragment); callers hand it paths that resolve against
//! the current location the way a browser resolves `pushState` URLs.

use url::Url;

use crate::error::HostError;
use crate::Result;

/// Path, query and fragment of a location, e.g. `/inbox?page=2#top`.
pub fn page_path(url: &Url) -> String {
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        path.push('#');
        path.push_str(fragment);
    }
    path
}

/// Resolve a caller-supplied path against the current location.
pub fn resolve(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|e| HostError::InvalidUrl {
        input: path.to_string(),
        reason: e.to_string(),
    })
}
