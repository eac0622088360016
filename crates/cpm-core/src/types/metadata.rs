//! Overlay entries for fields the Caddy tree cannot carry.

use crate::types::proxy::{BasicAuth, ChallengeType, HealthCheck, Proxy, RouteStatus, TlsMode};
use crate::types::redirect::Redirect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted side data for one proxy route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyMetadata {
    /// Route id this entry joins on
    pub id: String,

    /// Domain exactly as the user gave it
    #[serde(default)]
    pub domain: String,

    /// Target exactly as the user gave it
    #[serde(default)]
    pub target_url: String,

    /// TLS mode as requested (`custom` is indistinguishable from `auto` in the tree)
    #[serde(default)]
    pub ssl_mode: TlsMode,

    #[serde(default)]
    pub health_check: HealthCheck,

    #[serde(default)]
    pub challenge_type: ChallengeType,

    #[serde(default)]
    pub dns_provider: Option<String>,

    #[serde(default)]
    pub dns_credentials: BTreeMap<String, String>,

    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,

    #[serde(default)]
    pub status: RouteStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<&Proxy> for ProxyMetadata {
    fn from(proxy: &Proxy) -> Self {
        Self {
            id: proxy.id.clone(),
            domain: proxy.domain.clone(),
            target_url: proxy.target_url.clone(),
            ssl_mode: proxy.ssl_mode,
            health_check: proxy.health_check.clone(),
            challenge_type: proxy.challenge_type,
            dns_provider: proxy.dns_provider.clone(),
            dns_credentials: proxy.dns_credentials.clone(),
            custom_headers: proxy.custom_headers.clone(),
            basic_auth: proxy.basic_auth.clone(),
            status: proxy.status,
            created_at: proxy.created_at,
            updated_at: proxy.updated_at,
        }
    }
}

impl ProxyMetadata {
    /// Copy the overlay-only fields onto a reconstructed proxy.
    ///
    /// Routing fields (domain, target, TLS mode) are left alone; the
    /// reconciler decides whether the overlay's copies agree with the tree.
    pub fn apply_to(&self, proxy: &mut Proxy) {
        proxy.health_check = self.health_check.clone();
        proxy.challenge_type = self.challenge_type;
        proxy.dns_provider = self.dns_provider.clone();
        proxy.dns_credentials = self.dns_credentials.clone();
        proxy.custom_headers = self.custom_headers.clone();
        proxy.basic_auth = self.basic_auth.clone();
        proxy.status = self.status;
        proxy.created_at = self.created_at;
        proxy.updated_at = self.updated_at;
    }
}

/// Persisted side data for one redirect route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectMetadata {
    /// Route id this entry joins on
    pub id: String,

    /// Source domains verbatim, including port-qualified ones
    #[serde(default)]
    pub source_domains: Vec<String>,

    #[serde(default)]
    pub status: RouteStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<&Redirect> for RedirectMetadata {
    fn from(redirect: &Redirect) -> Self {
        Self {
            id: redirect.id.clone(),
            source_domains: redirect.source_domains.clone(),
            status: redirect.status,
            created_at: redirect.created_at,
            updated_at: redirect.updated_at,
        }
    }
}

impl RedirectMetadata {
    /// Copy the overlay-only fields onto a reconstructed redirect
    pub fn apply_to(&self, redirect: &mut Redirect) {
        if !self.source_domains.is_empty() {
            redirect.source_domains = self.source_domains.clone();
        }
        redirect.status = self.status;
        redirect.created_at = self.created_at;
        redirect.updated_at = self.updated_at;
    }
}

/// Whole overlay document as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Proxy entries by route id
    #[serde(default)]
    pub proxies: BTreeMap<String, ProxyMetadata>,

    /// Redirect entries by route id
    #[serde(default)]
    pub redirects: BTreeMap<String, RedirectMetadata>,
}

impl MetadataSnapshot {
    /// Returns true if no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty() && self.redirects.is_empty()
    }
}
