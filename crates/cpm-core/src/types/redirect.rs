use crate::error::ValidationError;
use crate::types::caddy::PATH_PLACEHOLDER;
use crate::types::proxy::{encode_route_id, RouteStatus};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Route id prefix for redirects
pub const REDIRECT_ID_PREFIX: &str = "redirect_";

/// Status codes a redirect may use
pub const REDIRECT_CODES: [u16; 2] = [301, 302];

/// An HTTP redirect definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Route id, `redirect_<encoded first domain>_<created unix seconds>`
    pub id: String,

    /// Domains that redirect, in order
    pub source_domains: Vec<String>,

    /// Where clients are sent
    pub destination_url: String,

    /// 301 or 302
    pub redirect_code: u16,

    /// Append the original request URI to the destination
    #[serde(default)]
    pub preserve_path: bool,

    /// Lifecycle status
    #[serde(default)]
    pub status: RouteStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Redirect {
    /// Create a redirect with a generated id and current timestamps
    #[must_use]
    pub fn new(
        source_domains: Vec<String>,
        destination_url: impl Into<String>,
        redirect_code: u16,
        preserve_path: bool,
    ) -> Self {
        Self::created_at(
            source_domains,
            destination_url,
            redirect_code,
            preserve_path,
            Utc::now().trunc_subsecs(0),
        )
    }

    /// Create a redirect as of a given creation time
    #[must_use]
    pub fn created_at(
        source_domains: Vec<String>,
        destination_url: impl Into<String>,
        redirect_code: u16,
        preserve_path: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        let first = source_domains.first().map_or("redirect", String::as_str);
        Self {
            id: encode_route_id(REDIRECT_ID_PREFIX, first, created_at),
            source_domains,
            destination_url: destination_url.into(),
            redirect_code,
            preserve_path,
            status: RouteStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }

    /// Bump `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().trunc_subsecs(0);
    }

    /// Value of the `Location` header
    #[must_use]
    pub fn location(&self) -> String {
        if self.preserve_path {
            format!("{}{PATH_PLACEHOLDER}", self.destination_url)
        } else {
            self.destination_url.clone()
        }
    }

    /// Reject anything that must not reach the live configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ValidationError::MissingSourceDomain);
        }

        if !self.destination_url.starts_with("http://") && !self.destination_url.starts_with("https://") {
            return Err(ValidationError::InvalidDestination(
                self.destination_url.clone(),
            ));
        }

        if !REDIRECT_CODES.contains(&self.redirect_code) {
            return Err(ValidationError::InvalidRedirectCode(self.redirect_code));
        }

        Ok(())
    }
}
