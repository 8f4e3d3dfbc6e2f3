//! Host derivation for grouping and path construction
//!
//! Credentials are grouped by the last two labels of a URL's host (the
//! "base host"), so `account.nvidia.com` and `www.nvidia.com` land in the
//! same group. Ports are part of the host, never stripped: `localhost:3000`
//! is a different host than `localhost`.

use thiserror::Error;
use url::Url;

/// Errors that can occur while deriving hosts from URLs
#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL '{url}' has no host")]
    NoHost { url: String },
}

/// Get the complete host of a URL, including an explicit port.
///
/// Scheme-default ports are dropped (`https://example.com:443/` is just
/// `example.com`), matching how browsers report the host.
pub fn full_host(url: &str) -> Result<String, HostError> {
    let parsed = Url::parse(url).map_err(|source| HostError::Invalid {
        url: url.to_string(),
        source,
    })?;

    let host = parsed.host_str().ok_or_else(|| HostError::NoHost {
        url: url.to_string(),
    })?;

    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Get the base host of a URL: the last two dot-separated labels of the
/// full host, or the whole host when it has fewer than two labels.
///
/// A port rides along with the final label, so `http://localhost:3000/`
/// yields `localhost:3000` and `https://www.example.com:8443/` yields
/// `example.com:8443`.
pub fn base_host(url: &str) -> Result<String, HostError> {
    let full = full_host(url)?;
    let labels: Vec<&str> = full.split('.').collect();
    let start = labels.len().saturating_sub(2);
    Ok(labels[start..].join("."))
}
