use crate::error::ValidationError;
use crate::types::provider::DnsProviderKind;
use crate::validate::{domain_port, validate_ip_list};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Route id prefix for proxies
pub const PROXY_ID_PREFIX: &str = "proxy_";

/// How certificates are obtained for a proxied domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Automatic certificates via ACME
    #[default]
    Auto,
    /// Certificates managed outside this tool
    Custom,
    /// Plain HTTP only
    None,
}

impl TlsMode {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Custom => "custom",
            Self::None => "none",
        }
    }
}

impl FromStr for TlsMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "custom" => Ok(Self::Custom),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::InvalidValue {
                field: "ssl_mode",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ACME challenge used to prove domain ownership
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    /// HTTP-01
    #[default]
    Http,
    /// DNS-01
    Dns,
}

impl FromStr for ChallengeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "dns" => Ok(Self::Dns),
            _ => Err(ValidationError::InvalidValue {
                field: "challenge_type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Dns => write!(f, "dns"),
        }
    }
}

/// Lifecycle status of a proxy or redirect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    /// Serving traffic
    #[default]
    Active,
    /// Disabled
    Inactive,
    /// Last operation failed
    Error,
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// HTTP basic authentication in front of a proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Whether the authentication handler is emitted
    #[serde(default)]
    pub enabled: bool,

    /// User name
    #[serde(default)]
    pub username: String,

    /// Plaintext password; hashed before it reaches Caddy
    #[serde(default)]
    pub password: String,
}

impl BasicAuth {
    /// Returns true if an authentication handler should be built
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Health-check parameters consumed by an external poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    /// Whether the poller should check this proxy
    pub enabled: bool,

    /// Probe interval, e.g. `30s`
    pub interval: String,

    /// Path to request
    pub path: String,

    /// Status that counts as healthy
    pub expected_status: u16,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: "30s".to_string(),
            path: "/".to_string(),
            expected_status: 200,
        }
    }
}

/// A reverse proxy definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// Route id, `proxy_<encoded domain>_<created unix seconds>`
    pub id: String,

    /// Public domain, optionally with an explicit `:port`
    pub domain: String,

    /// Upstream target, `host:port` or an http(s) URL
    pub target_url: String,

    /// TLS mode
    #[serde(default)]
    pub ssl_mode: TlsMode,

    /// ACME challenge type
    #[serde(default)]
    pub challenge_type: ChallengeType,

    /// DNS provider name for the DNS-01 challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_provider: Option<String>,

    /// Provider credentials keyed by field name
    #[serde(default)]
    pub dns_credentials: BTreeMap<String, String>,

    /// Extra request headers sent upstream
    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,

    /// Optional basic authentication
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,

    /// Client IPs/CIDRs allowed (takes precedence over `blocked_ips`)
    #[serde(default)]
    pub allowed_ips: Vec<String>,

    /// Client IPs/CIDRs refused
    #[serde(default)]
    pub blocked_ips: Vec<String>,

    /// Health-check settings
    #[serde(default)]
    pub health_check: HealthCheck,

    /// Lifecycle status
    #[serde(default)]
    pub status: RouteStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Proxy {
    /// Create a proxy with a generated id and current timestamps
    #[must_use]
    pub fn new(domain: impl Into<String>, target_url: impl Into<String>, ssl_mode: TlsMode) -> Self {
        Self::created_at(domain, target_url, ssl_mode, Utc::now().trunc_subsecs(0))
    }

    /// Create a proxy as of a given creation time
    #[must_use]
    pub fn created_at(
        domain: impl Into<String>,
        target_url: impl Into<String>,
        ssl_mode: TlsMode,
        created_at: DateTime<Utc>,
    ) -> Self {
        let domain = domain.into();
        Self {
            id: proxy_id(&domain, created_at),
            domain,
            target_url: target_url.into(),
            ssl_mode,
            challenge_type: ChallengeType::Http,
            dns_provider: None,
            dns_credentials: BTreeMap::new(),
            custom_headers: BTreeMap::new(),
            basic_auth: None,
            allowed_ips: Vec::new(),
            blocked_ips: Vec::new(),
            health_check: HealthCheck::default(),
            status: RouteStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }

    /// Shell used by the reconciler before the overlay is applied
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        let mut proxy = Self::created_at("", "", TlsMode::Auto, DateTime::<Utc>::UNIX_EPOCH);
        proxy.id = id.into();
        proxy
    }

    /// Bump `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().trunc_subsecs(0);
    }

    /// Returns true if the DNS-01 configurator applies to this proxy
    #[must_use]
    pub fn uses_dns_challenge(&self) -> bool {
        self.ssl_mode == TlsMode::Auto && self.challenge_type == ChallengeType::Dns
    }

    /// Parsed DNS provider, if one is named
    pub fn dns_provider_kind(&self) -> Result<Option<DnsProviderKind>, ValidationError> {
        self.dns_provider
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(str::parse::<DnsProviderKind>)
            .transpose()
    }

    /// Checks that do not need the target resolver
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.domain.trim().is_empty() {
            return Err(ValidationError::EmptyField("domain"));
        }
        if self.domain.trim() != self.domain {
            return Err(ValidationError::PaddedDomain(self.domain.clone()));
        }
        if self.target_url.trim().is_empty() {
            return Err(ValidationError::EmptyField("target_url"));
        }

        validate_ip_list("allowed IPs", &self.allowed_ips)?;
        validate_ip_list("blocked IPs", &self.blocked_ips)?;

        if self.uses_dns_challenge() && self.dns_provider_kind()?.is_none() {
            return Err(ValidationError::MissingDnsProvider);
        }

        if self.ssl_mode == TlsMode::None {
            if let Some(port @ 443) = domain_port(&self.domain) {
                return Err(ValidationError::PortConflict {
                    domain: self.domain.clone(),
                    port,
                    mode: self.ssl_mode.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Encode a domain into a route id: `.` and `:` become `_`
#[must_use]
pub fn encode_route_id(prefix: &str, domain: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{prefix}{}_{}",
        domain.replace(['.', ':'], "_"),
        created_at.timestamp()
    )
}

/// Route id for a proxy
#[must_use]
pub fn proxy_id(domain: &str, created_at: DateTime<Utc>) -> String {
    encode_route_id(PROXY_ID_PREFIX, domain, created_at)
}

/// Best-effort inverse of [`proxy_id`].
///
/// The encoding is lossy: underscores in the original domain are read back as
/// dots. A trailing label is taken as a port when it cannot be an IPv4 octet
/// (above 255) or when it follows a single host label, e.g. `localhost_9801`.
#[must_use]
pub fn domain_from_proxy_id(id: &str) -> Option<String> {
    let rest = id.strip_prefix(PROXY_ID_PREFIX)?;
    let (encoded, stamp) = rest.rsplit_once('_')?;
    if encoded.is_empty() || stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut labels: Vec<&str> = encoded.split('_').collect();
    let port = match labels.as_slice() {
        [_, .., last] => last
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 255 || labels.len() == 2),
        _ => None,
    };

    if port.is_some() {
        labels.pop();
    }

    let host = labels.join(".");
    Some(match port {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_new_proxy_defaults() {
        let proxy = Proxy::created_at("example.com", "localhost:3000", TlsMode::Auto, at(1_755_490_936));
        assert_eq!(proxy.id, "proxy_example_com_1755490936");
        assert_eq!(proxy.challenge_type, ChallengeType::Http);
        assert_eq!(proxy.status, RouteStatus::Active);
        assert_eq!(proxy.health_check.interval, "30s");
        assert_eq!(proxy.health_check.path, "/");
        assert_eq!(proxy.health_check.expected_status, 200);
        assert_eq!(proxy.created_at, proxy.updated_at);
    }

    #[test]
    fn test_port_qualified_id() {
        assert_eq!(
            proxy_id("localhost:9801", at(1_755_490_936)),
            "proxy_localhost_9801_1755490936"
        );
    }

    #[test]
    fn test_decode_ids() {
        assert_eq!(
            domain_from_proxy_id("proxy_example_com_1755490936").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            domain_from_proxy_id("proxy_localhost_9801_1755490936").as_deref(),
            Some("localhost:9801")
        );
        assert_eq!(
            domain_from_proxy_id("proxy_app_example_com_8443_1").as_deref(),
            Some("app.example.com:8443")
        );
        assert_eq!(
            domain_from_proxy_id("proxy_192_168_1_10_1").as_deref(),
            Some("192.168.1.10")
        );
        assert_eq!(domain_from_proxy_id("redirect_example_com_1"), None);
        assert_eq!(domain_from_proxy_id("proxy_example_com_abc"), None);
    }

    #[test]
    fn test_validate_rejects_bad_cidr() {
        let mut proxy = Proxy::new("example.com", "localhost:3000", TlsMode::Auto);
        proxy.allowed_ips = vec!["300.1.1.1/40".into()];
        assert!(matches!(
            proxy.validate(),
            Err(ValidationError::InvalidIp { field: "allowed IPs", .. })
        ));
    }

    #[test]
    fn test_validate_dns_provider() {
        let mut proxy = Proxy::new("example.com", "localhost:3000", TlsMode::Auto);
        proxy.challenge_type = ChallengeType::Dns;
        assert_eq!(proxy.validate(), Err(ValidationError::MissingDnsProvider));

        proxy.dns_provider = Some("route53".into());
        assert_eq!(
            proxy.validate(),
            Err(ValidationError::UnsupportedDnsProvider("route53".into()))
        );

        proxy.dns_provider = Some("cloudflare".into());
        assert!(proxy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_padded_domain() {
        for domain in [" example.com", "example.com ", "\texample.com\n"] {
            let proxy = Proxy::new(domain, "localhost:3000", TlsMode::Auto);
            assert_eq!(
                proxy.validate(),
                Err(ValidationError::PaddedDomain(domain.to_string()))
            );
        }

        let blank = Proxy::new("   ", "localhost:3000", TlsMode::Auto);
        assert_eq!(blank.validate(), Err(ValidationError::EmptyField("domain")));
    }

    #[test]
    fn test_validate_http_only_port_443() {
        let proxy = Proxy::new("example.com:443", "localhost:3000", TlsMode::None);
        assert!(matches!(
            proxy.validate(),
            Err(ValidationError::PortConflict { port: 443, .. })
        ));
    }

    #[test]
    fn test_json_shape() {
        let proxy = Proxy::created_at("example.com", "localhost:3000", TlsMode::None, at(0));
        let value = serde_json::to_value(&proxy).unwrap();
        assert_eq!(value["ssl_mode"], "none");
        assert_eq!(value["created_at"], "1970-01-01T00:00:00Z");

        let back: Proxy = serde_json::from_value(value).unwrap();
        assert_eq!(back, proxy);
    }
}
