//! Typed view of the Caddy JSON configuration tree.
//!
//! Only the parts the manager reads or writes are modelled. Every struct keeps
//! unrecognised keys in an `extra` map, and handler/issuer/provider modules of
//! unknown kinds are carried as raw JSON through [`Module::Unknown`], so a
//! read-modify-write cycle never drops configuration created elsewhere.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Unmodelled keys preserved across a round trip
pub type Extra = Map<String, Value>;

/// Server bucket for TLS mode `none`
pub const HTTP_ONLY_SERVER: &str = "http_only";

/// Server bucket for every other TLS mode and for redirects
pub const HTTPS_SERVER: &str = "https_enabled";

/// Placeholder appended to a redirect destination to keep the request path
pub const PATH_PLACEHOLDER: &str = "{http.request.uri}";

/// Key of the global ACME certificate authority slot
pub const DEFAULT_CA: &str = "acme";

/// Root of the Caddy configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaddyConfig {
    /// Configured apps
    #[serde(default)]
    pub apps: Apps,

    #[serde(flatten)]
    pub extra: Extra,
}

impl CaddyConfig {
    /// All server buckets
    #[must_use]
    pub const fn servers(&self) -> &BTreeMap<String, Server> {
        &self.apps.http.servers
    }

    /// Mutable access to the server buckets
    pub fn servers_mut(&mut self) -> &mut BTreeMap<String, Server> {
        &mut self.apps.http.servers
    }

    /// Find a route by its `@id` across all buckets
    #[must_use]
    pub fn find_route(&self, id: &str) -> Option<(&str, &Route)> {
        self.servers().iter().find_map(|(name, server)| {
            server
                .routes
                .iter()
                .find(|r| r.id() == Some(id))
                .map(|r| (name.as_str(), r))
        })
    }

    /// Total number of routes across all buckets
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.servers().values().map(|s| s.routes.len()).sum()
    }
}

/// The `apps` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Apps {
    /// HTTP app holding the server buckets
    #[serde(default)]
    pub http: HttpApp,

    /// TLS app holding global certificate settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsApp>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// The `apps.http` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpApp {
    /// Named server buckets
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A server bucket: listeners, routes and TLS policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Listener addresses such as `":80"`
    #[serde(default)]
    pub listen: Vec<String>,

    /// Ordered routes
    #[serde(default)]
    pub routes: Vec<Route>,

    /// Automatic HTTPS toggle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_https: Option<AutomaticHttps>,

    /// Per-domain TLS connection policies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls_policies: Vec<TlsPolicy>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Server {
    /// Returns true if the bucket listens on `port` (given as `":443"`)
    #[must_use]
    pub fn listens_on(&self, port: &str) -> bool {
        self.listen.iter().any(|l| l == port)
    }

    /// Returns true if automatic HTTPS is explicitly disabled
    #[must_use]
    pub fn automatic_https_disabled(&self) -> bool {
        self.automatic_https.as_ref().is_some_and(|a| a.disable)
    }
}

/// The `automatic_https` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomaticHttps {
    /// Disable all automatic HTTPS behaviour
    #[serde(default)]
    pub disable: bool,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A route: matcher sets plus an ordered handler chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Stable identifier, the join key with the metadata overlay
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Matcher sets; any set matching selects the route
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherSet>,

    /// Handler chain
    #[serde(default)]
    pub handle: Vec<Module<Handler>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Route {
    /// Non-empty route identifier
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Recognised handlers in chain order
    pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
        self.handle.iter().filter_map(Module::known)
    }

    /// First reverse proxy handler, wherever it sits in the chain
    #[must_use]
    pub fn reverse_proxy(&self) -> Option<&ReverseProxyHandler> {
        self.handlers().find_map(|h| match h {
            Handler::ReverseProxy(rp) => Some(rp),
            _ => None,
        })
    }

    /// First host name any matcher set selects on
    #[must_use]
    pub fn first_host(&self) -> Option<&str> {
        self.matchers
            .first()
            .and_then(|m| m.host.first())
            .map(String::as_str)
    }

    /// All host names across matcher sets
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.matchers
            .iter()
            .flat_map(|m| m.host.iter().map(String::as_str))
    }
}

/// One matcher set; all present matchers must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherSet {
    /// Host names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,

    /// Client address ranges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<RemoteIpMatch>,

    /// Negated matcher sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not: Vec<MatcherSet>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl MatcherSet {
    /// Matcher set selecting a single host
    #[must_use]
    pub fn host(domain: impl Into<String>) -> Self {
        Self {
            host: vec![domain.into()],
            ..Self::default()
        }
    }
}

/// The `remote_ip` matcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIpMatch {
    /// IPs or CIDR ranges
    #[serde(default)]
    pub ranges: Vec<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A module slot that is either understood or carried verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Module<T> {
    /// A module kind this crate models
    Known(T),
    /// Anything else, preserved as-is
    Unknown(Value),
}

impl<T> Module<T> {
    /// The typed module, if recognised
    pub const fn known(&self) -> Option<&T> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }
}

impl<T> From<T> for Module<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

/// HTTP handler modules the manager emits and reads back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum Handler {
    /// `authentication` with an `http_basic` provider
    Authentication(AuthenticationHandler),
    /// `reverse_proxy`
    ReverseProxy(ReverseProxyHandler),
    /// `headers` manipulation
    Headers(HeadersHandler),
    /// `static_response`
    StaticResponse(StaticResponseHandler),
}

/// `authentication` handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationHandler {
    /// Authentication providers
    #[serde(default)]
    pub providers: AuthProviders,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Providers of the `authentication` handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthProviders {
    /// HTTP basic authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_basic: Option<HttpBasicProvider>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `http_basic` provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpBasicProvider {
    /// Hash algorithm the account passwords use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<HashAlgorithm>,

    /// Accounts with hashed passwords
    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Password hash selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashAlgorithm {
    /// Algorithm name, e.g. `argon2id`
    pub algorithm: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Basic auth account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// User name
    pub username: String,

    /// Hashed password, never plaintext
    pub password: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `reverse_proxy` handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseProxyHandler {
    /// Upstream backends
    #[serde(default)]
    pub upstreams: Vec<Upstream>,

    /// Outbound transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    /// Header manipulation for proxied requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderOps>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl ReverseProxyHandler {
    /// Dial address of the first upstream
    #[must_use]
    pub fn first_dial(&self) -> Option<&str> {
        self.upstreams
            .first()
            .map(|u| u.dial.as_str())
            .filter(|d| !d.is_empty())
    }
}

/// Upstream backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    /// `host:port` to connect to
    #[serde(default)]
    pub dial: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Reverse proxy transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    /// Transport protocol, `http`
    pub protocol: String,

    /// Present (possibly empty) when upstream connections use TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Extra>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Request/response header operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderOps {
    /// Operations on the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HeaderOp>,

    /// Operations on the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HeaderOp>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single header operation block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderOp {
    /// Headers to overwrite
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Vec<String>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl HeaderOp {
    /// First value set for `name`
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.set
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// `headers` handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadersHandler {
    /// Operations on the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HeaderOp>,

    /// Operations on the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HeaderOp>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `static_response` handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticResponseHandler {
    /// Response status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Caddy accepts a status code as a number or a placeholder string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusCode {
    /// Numeric status
    Code(u16),
    /// String form, possibly a placeholder
    Text(String),
}

impl StatusCode {
    /// Numeric value, if it is (or parses as) a number
    #[must_use]
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::Code(c) => Some(*c),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

/// A server TLS connection policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsPolicy {
    /// Which handshakes the policy applies to
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<TlsMatch>,

    /// Certificate issuers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<Module<Issuer>>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl TlsPolicy {
    /// SNI names the policy matches
    #[must_use]
    pub fn sni(&self) -> &[String] {
        self.matcher
            .as_ref()
            .map_or(&[] as &[String], |m| m.sni.as_slice())
    }
}

/// TLS handshake matcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsMatch {
    /// Server names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sni: Vec<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Certificate issuer modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum Issuer {
    /// ACME issuer
    Acme(AcmeIssuer),
}

/// ACME issuer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcmeIssuer {
    /// Challenge configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenges: Option<Challenges>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl AcmeIssuer {
    /// DNS provider of the DNS-01 challenge, if configured
    #[must_use]
    pub fn dns_provider(&self) -> Option<&Module<DnsProvider>> {
        self.challenges
            .as_ref()
            .and_then(|c| c.dns.as_ref())
            .map(|d| &d.provider)
    }
}

/// ACME challenge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Challenges {
    /// DNS-01 challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsChallenge>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// DNS-01 challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsChallenge {
    /// DNS provider module
    pub provider: Module<DnsProvider>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// DNS provider modules, each with the credentials it needs.
///
/// Keys a provider plugin accepts beyond the modelled credentials (zone
/// tokens, TTLs, override domains) are kept in each variant's `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum DnsProvider {
    /// Cloudflare
    #[serde(rename = "dns.providers.cloudflare")]
    Cloudflare(CloudflareProvider),
    /// DigitalOcean
    #[serde(rename = "dns.providers.digitalocean")]
    DigitalOcean(DigitalOceanProvider),
    /// DuckDNS
    #[serde(rename = "dns.providers.duckdns")]
    DuckDns(DuckDnsProvider),
    /// Hetzner
    #[serde(rename = "dns.providers.hetzner")]
    Hetzner(HetznerProvider),
    /// Gandi
    #[serde(rename = "dns.providers.gandi")]
    Gandi(GandiProvider),
    /// DNSimple
    #[serde(rename = "dns.providers.dnsimple")]
    Dnsimple(DnsimpleProvider),
}

/// `dns.providers.cloudflare`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudflareProvider {
    /// API token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_token: String,

    /// Account email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `dns.providers.digitalocean`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalOceanProvider {
    /// Auth token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `dns.providers.duckdns`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckDnsProvider {
    /// Account token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `dns.providers.hetzner`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HetznerProvider {
    /// API token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_token: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `dns.providers.gandi`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GandiProvider {
    /// Personal access token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bearer_token: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// `dns.providers.dnsimple`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsimpleProvider {
    /// API access token
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_access_token: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// The `apps.tls` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsApp {
    /// Named certificate authority configurations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub certificate_authorities: BTreeMap<String, Module<Issuer>>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One entry of `GET /reverse_proxy/upstreams`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamStatus {
    /// Dial address of the upstream
    #[serde(default)]
    pub address: String,

    /// Requests currently in flight
    #[serde(default)]
    pub num_requests: u64,

    /// Recent failure count
    #[serde(default)]
    pub fails: u64,
}

impl UpstreamStatus {
    /// Returns true if no failures have been recorded
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.fails == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_parses() {
        let config: CaddyConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.servers().is_empty());
        assert!(config.apps.tls.is_none());
    }

    #[test]
    fn test_known_handlers_are_typed() {
        let route: Route = serde_json::from_value(json!({
            "@id": "proxy_example_com_1",
            "match": [{"host": ["example.com"]}],
            "handle": [{
                "handler": "reverse_proxy",
                "upstreams": [{"dial": "localhost:3000"}]
            }]
        }))
        .unwrap();

        assert_eq!(route.id(), Some("proxy_example_com_1"));
        assert_eq!(route.first_host(), Some("example.com"));
        assert_eq!(
            route.reverse_proxy().and_then(ReverseProxyHandler::first_dial),
            Some("localhost:3000")
        );
    }

    #[test]
    fn test_unknown_modules_survive_round_trip() {
        let raw = json!({
            "apps": {
                "http": {
                    "servers": {
                        "srv0": {
                            "listen": [":8080"],
                            "routes": [{
                                "handle": [
                                    {"handler": "file_server", "root": "/srv"},
                                    {
                                        "handler": "reverse_proxy",
                                        "upstreams": [{"dial": "a:1", "max_requests": 5}],
                                        "load_balancing": {"selection_policy": {"policy": "first"}}
                                    }
                                ],
                                "terminal": true
                            }],
                            "logs": {}
                        }
                    },
                    "grace_period": "5s"
                },
                "pki": {"certificate_authorities": {}}
            },
            "admin": {"listen": "localhost:2019"}
        });

        let config: CaddyConfig = serde_json::from_value(raw.clone()).unwrap();
        let route = &config.servers()["srv0"].routes[0];
        assert!(matches!(route.handle[0], Module::Unknown(_)));
        assert!(route.reverse_proxy().is_some());

        assert_eq!(serde_json::to_value(&config).unwrap(), raw);
    }

    fn global_slot(provider: Value) -> Value {
        json!({
            "apps": {
                "http": {"servers": {}},
                "tls": {"certificate_authorities": {"acme": {
                    "module": "acme",
                    "challenges": {"dns": {"provider": provider}}
                }}}
            }
        })
    }

    #[test]
    fn test_known_providers_keep_unmodelled_keys() {
        let duckdns = global_slot(json!({
            "name": "dns.providers.duckdns",
            "api_token": "secret",
            "override_domain": "x.duckdns.org"
        }));
        let config: CaddyConfig = serde_json::from_value(duckdns.clone()).unwrap();
        let tls = config.apps.tls.as_ref().unwrap();
        let Some(Issuer::Acme(acme)) = tls.certificate_authorities[DEFAULT_CA].known() else {
            panic!("expected an ACME issuer");
        };
        let Some(DnsProvider::DuckDns(duck)) = acme.dns_provider().and_then(Module::known) else {
            panic!("expected the duckdns provider");
        };
        assert!(duck.token.is_empty());
        assert_eq!(duck.extra["api_token"], "secret");
        assert_eq!(serde_json::to_value(&config).unwrap(), duckdns);

        let cloudflare = global_slot(json!({
            "name": "dns.providers.cloudflare",
            "api_token": "a",
            "zone_token": "z"
        }));
        let config: CaddyConfig = serde_json::from_value(cloudflare.clone()).unwrap();
        let tls = config.apps.tls.as_ref().unwrap();
        let Some(Issuer::Acme(acme)) = tls.certificate_authorities[DEFAULT_CA].known() else {
            panic!("expected an ACME issuer");
        };
        let Some(DnsProvider::Cloudflare(cf)) = acme.dns_provider().and_then(Module::known) else {
            panic!("expected the cloudflare provider");
        };
        assert_eq!(cf.api_token, "a");
        assert_eq!(cf.extra["zone_token"], "z");
        assert_eq!(serde_json::to_value(&config).unwrap(), cloudflare);
    }

    #[test]
    fn test_dns_provider_tagging() {
        let provider = DnsProvider::Cloudflare(CloudflareProvider {
            api_token: "tok".into(),
            ..CloudflareProvider::default()
        });
        assert_eq!(
            serde_json::to_value(&provider).unwrap(),
            json!({"name": "dns.providers.cloudflare", "api_token": "tok"})
        );

        let other: Module<DnsProvider> =
            serde_json::from_value(json!({"name": "route53", "region": "eu"})).unwrap();
        assert!(other.known().is_none());
    }

    #[test]
    fn test_status_code_forms() {
        let numeric: StaticResponseHandler =
            serde_json::from_value(json!({"status_code": 301})).unwrap();
        let text: StaticResponseHandler =
            serde_json::from_value(json!({"status_code": "302"})).unwrap();
        let placeholder: StaticResponseHandler =
            serde_json::from_value(json!({"status_code": "{http.error.status_code}"})).unwrap();

        assert_eq!(numeric.status_code.and_then(|s| s.as_u16()), Some(301));
        assert_eq!(text.status_code.and_then(|s| s.as_u16()), Some(302));
        assert_eq!(placeholder.status_code.and_then(|s| s.as_u16()), None);
    }
}
