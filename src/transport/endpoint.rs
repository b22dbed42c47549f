//! Connection URL resolution.
//!
//! Callers may hand the transport the HTTP URL of the endpoint; the socket
//! needs the matching WebSocket scheme.

use url::Url;

use crate::error::{Error, Result};

/// Parses `url` and maps `http` to `ws` and `https` to `wss`.
///
/// Other schemes pass through unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `url` is blank or unparsable.
pub fn resolve_url(url: &str) -> Result<Url> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::invalid_argument("url must not be empty"));
    }

    let mut parsed =
        Url::parse(url).map_err(|e| Error::invalid_argument(format!("url {url:?}: {e}")))?;

    let scheme = match parsed.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Ok(parsed),
    };

    parsed
        .set_scheme(scheme)
        .map_err(|()| Error::invalid_argument(format!("cannot use scheme {scheme} for {url:?}")))?;

    Ok(parsed)
}
