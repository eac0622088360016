use thiserror::Error;

/// Result type alias for proxy manager operations
pub type Result<T> = std::result::Result<T, CpmError>;

/// Input rejected before any configuration change is attempted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Target could not be parsed as a URL or host:port
    #[error("invalid target URL '{target}': {reason}")]
    InvalidTarget {
        /// The offending target string
        target: String,
        /// Parser message
        reason: String,
    },

    /// Entry in an allow/block list is neither an IP nor a CIDR range
    #[error("invalid {field}: invalid IP address or CIDR range: {value}")]
    InvalidIp {
        /// Which list the entry came from
        field: &'static str,
        /// The offending entry
        value: String,
    },

    /// DNS provider name has no known credential layout
    #[error("unsupported DNS provider: {0}")]
    UnsupportedDnsProvider(String),

    /// DNS challenge requested without naming a provider
    #[error("DNS provider is required for DNS challenge")]
    MissingDnsProvider,

    /// Redirect status outside {301, 302}
    #[error("redirect code must be 301 or 302, got {0}")]
    InvalidRedirectCode(u16),

    /// Redirect with no source domains
    #[error("at least one source domain is required")]
    MissingSourceDomain,

    /// Redirect destination missing or not an http(s) URL
    #[error("destination URL must start with http:// or https://: '{0}'")]
    InvalidDestination(String),

    /// Domain-embedded port collides with the listener layout
    #[error("domain '{domain}' cannot use port {port} with TLS mode '{mode}'")]
    PortConflict {
        /// Domain as supplied
        domain: String,
        /// Embedded port
        port: u16,
        /// TLS mode of the proxy
        mode: String,
    },

    /// A route with this id is already in the live configuration
    #[error("route with ID {0} already exists")]
    DuplicateId(String),

    /// Required field left empty
    #[error("{0} is required")]
    EmptyField(&'static str),

    /// Domain with leading or trailing whitespace
    #[error("domain must not have surrounding whitespace: '{0}'")]
    PaddedDomain(String),

    /// Enumerated field holds an unknown value
    #[error("invalid {field}: '{value}'")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Errors that can occur when managing Caddy configuration
#[derive(Error, Debug)]
pub enum CpmError {
    /// Input failed validation; nothing was changed
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Admin API answered with a non-success status
    #[error("caddy API returned status {code}: {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body
        message: String,
    },

    /// Admin API request could not be sent or read
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Admin API request exceeded the client timeout
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Route or resource not present in the live configuration
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing failed
    #[error("failed to hash password: {0}")]
    Hash(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CpmError {
    /// Returns true if the error was raised before touching the live config
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the error came from the admin API transport
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Http(_) | Self::Timeout(_))
    }

    /// Returns the HTTP status code if this is an API error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Shorthand for a missing route
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts() {
        let err: CpmError = ValidationError::InvalidRedirectCode(307).into();
        assert!(err.is_validation());
        assert!(!err.is_transport());
        assert_eq!(
            err.to_string(),
            "validation failed: redirect code must be 301 or 302, got 307"
        );
    }

    #[test]
    fn test_status_codes() {
        let api = CpmError::Api {
            code: 500,
            message: "boom".into(),
        };
        assert_eq!(api.status_code(), Some(500));
        assert!(api.is_transport());
        assert_eq!(CpmError::not_found("route with ID x").status_code(), Some(404));
        assert_eq!(CpmError::Http("refused".into()).status_code(), None);
    }
}
