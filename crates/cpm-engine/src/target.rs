//! Upstream target parsing.
//!
//! Targets are accepted either bare (`host:port`) or with an `http://` /
//! `https://` scheme. Upstream TLS is only enabled by an explicit `https://`
//! prefix; a bare `host:443` is dialled in plaintext.

use cpm_core::ValidationError;
use url::Url;

/// Where and how the reverse proxy reaches an upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// `host:port` to dial
    pub dial: String,

    /// Whether the upstream connection uses TLS
    pub tls: bool,

    /// Bare host name forced into the upstream `Host` header
    pub host: String,
}

/// Parse a target string into a dial address, TLS flag and Host value
pub fn resolve_target(target: &str) -> Result<ResolvedTarget, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(invalid("target is empty".into()));
    }

    let has_scheme = trimmed.contains("://");
    let parsed = if has_scheme {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    }
    .map_err(|e| invalid(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host".into()))?;

    let port = parsed.port_or_known_default().unwrap_or(80);

    Ok(ResolvedTarget {
        dial: format!("{host}:{port}"),
        tls: has_scheme && parsed.scheme() == "https",
        host: host.to_string(),
    })
}

/// Port of a `host:port` dial address
#[must_use]
pub fn dial_port(dial: &str) -> Option<u16> {
    dial.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}

/// Target URL reconstructed from a dial address alone
#[must_use]
pub fn target_from_dial(dial: &str) -> String {
    let scheme = if dial_port(dial) == Some(443) {
        "https"
    } else {
        "http"
    };
    format!("{scheme}://{dial}")
}

/// Returns true if `target` dials exactly `dial`
#[must_use]
pub fn target_matches_dial(target: &str, dial: &str) -> bool {
    resolve_target(target).is_ok_and(|t| t.dial == dial)
}
