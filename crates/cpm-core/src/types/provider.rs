use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A credential a DNS provider needs, with its environment fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialField {
    /// Key in `Proxy::dns_credentials`
    pub key: &'static str,

    /// Environment variable consulted when the key is absent or empty
    pub env: &'static str,

    /// Whether the provider cannot work without it
    pub required: bool,
}

const fn required(key: &'static str, env: &'static str) -> CredentialField {
    CredentialField {
        key,
        env,
        required: true,
    }
}

const CLOUDFLARE: &[CredentialField] = &[
    required("api_token", "CLOUDFLARE_API_TOKEN"),
    CredentialField {
        key: "email",
        env: "CLOUDFLARE_EMAIL",
        required: false,
    },
];
const DIGITALOCEAN: &[CredentialField] = &[required("auth_token", "DO_AUTH_TOKEN")];
const DUCKDNS: &[CredentialField] = &[required("token", "DUCKDNS_TOKEN")];
const HETZNER: &[CredentialField] = &[required("api_token", "HETZNER_API_TOKEN")];
const GANDI: &[CredentialField] = &[required("bearer_token", "GANDI_BEARER_TOKEN")];
const DNSIMPLE: &[CredentialField] = &[required("api_access_token", "DNSIMPLE_API_ACCESS_TOKEN")];

/// DNS providers supported for the DNS-01 challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsProviderKind {
    /// Cloudflare
    Cloudflare,
    /// DigitalOcean
    DigitalOcean,
    /// DuckDNS
    DuckDns,
    /// Hetzner
    Hetzner,
    /// Gandi
    Gandi,
    /// DNSimple
    Dnsimple,
}

impl DnsProviderKind {
    /// Every supported provider
    pub const ALL: [Self; 6] = [
        Self::Cloudflare,
        Self::DigitalOcean,
        Self::DuckDns,
        Self::Hetzner,
        Self::Gandi,
        Self::Dnsimple,
    ];

    /// Provider name as users write it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::DigitalOcean => "digitalocean",
            Self::DuckDns => "duckdns",
            Self::Hetzner => "hetzner",
            Self::Gandi => "gandi",
            Self::Dnsimple => "dnsimple",
        }
    }

    /// Credential fields this provider reads
    #[must_use]
    pub const fn credentials(self) -> &'static [CredentialField] {
        match self {
            Self::Cloudflare => CLOUDFLARE,
            Self::DigitalOcean => DIGITALOCEAN,
            Self::DuckDns => DUCKDNS,
            Self::Hetzner => HETZNER,
            Self::Gandi => GANDI,
            Self::Dnsimple => DNSIMPLE,
        }
    }
}

impl FromStr for DnsProviderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnsupportedDnsProvider(s.to_string()))
    }
}

impl std::fmt::Display for DnsProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
