//! Reconstruction of proxies and redirects from a live configuration tree.
//!
//! The tree is authoritative for routing. Overlay entries supply the fields
//! the tree cannot express, and their verbatim copies of routing fields are
//! used only where they agree with what the tree actually does.

use crate::target::{target_from_dial, target_matches_dial};
use cpm_core::validate::has_explicit_port;
use cpm_core::{
    domain_from_proxy_id, CaddyConfig, Handler, MetadataSnapshot, Proxy, ProxyMetadata,
    Redirect, Route, Server, TlsMode, DEFAULT_CA, HTTP_ONLY_SERVER, PATH_PLACEHOLDER,
    REDIRECT_ID_PREFIX,
};
use chrono::{DateTime, Utc};

/// Every manager-created proxy in the tree
#[must_use]
pub fn parse_proxies(config: &CaddyConfig, overlay: &MetadataSnapshot) -> Vec<Proxy> {
    config
        .servers()
        .iter()
        .flat_map(|(name, server)| {
            server
                .routes
                .iter()
                .filter_map(move |route| proxy_from_route(name, server, route, overlay))
        })
        .collect()
}

/// Every manager-created redirect in the tree
#[must_use]
pub fn parse_redirects(config: &CaddyConfig, overlay: &MetadataSnapshot) -> Vec<Redirect> {
    config
        .servers()
        .values()
        .flat_map(|server| server.routes.iter())
        .filter_map(|route| redirect_from_route(route, overlay))
        .collect()
}

/// Name of the DNS provider in the global ACME slot, if any
#[must_use]
pub fn global_dns_provider(config: &CaddyConfig) -> Option<String> {
    let tls = config.apps.tls.as_ref()?;
    let cpm_core::Issuer::Acme(acme) = tls.certificate_authorities.get(DEFAULT_CA)?.known()?;
    let provider = serde_json::to_value(acme.dns_provider()?).ok()?;
    provider
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.trim_start_matches("dns.providers.").to_string())
}

fn proxy_from_route(
    bucket: &str,
    server: &Server,
    route: &Route,
    overlay: &MetadataSnapshot,
) -> Option<Proxy> {
    let id = route.id()?;
    let rp = route.reverse_proxy()?;
    let entry = overlay.proxies.get(id);

    let mut proxy = Proxy::placeholder(id);
    if let Some(entry) = entry {
        entry.apply_to(&mut proxy);
    }

    proxy.domain = route
        .first_host()
        .map(String::from)
        .or_else(|| entry.map(|e| e.domain.clone()).filter(|d| !d.is_empty()))
        .or_else(|| domain_from_proxy_id(id))
        .unwrap_or_default();

    proxy.target_url = match (rp.first_dial(), entry) {
        (Some(dial), Some(e)) if target_matches_dial(&e.target_url, dial) => e.target_url.clone(),
        (Some(dial), _) => target_from_dial(dial),
        (None, _) => String::new(),
    };

    proxy.ssl_mode = reconcile_tls_mode(tree_tls_mode(bucket, server), entry);

    for set in &route.matchers {
        if let Some(remote) = &set.remote_ip {
            proxy.allowed_ips.extend(remote.ranges.iter().cloned());
        }
        for negated in &set.not {
            if let Some(remote) = &negated.remote_ip {
                proxy.blocked_ips.extend(remote.ranges.iter().cloned());
            }
        }
    }

    Some(proxy)
}

fn tree_tls_mode(bucket: &str, server: &Server) -> TlsMode {
    if bucket == HTTP_ONLY_SERVER || !server.listens_on(":443") {
        TlsMode::None
    } else {
        TlsMode::Auto
    }
}

/// The overlay can refine `auto` into `custom`, but never contradict the bucket
fn reconcile_tls_mode(tree: TlsMode, entry: Option<&ProxyMetadata>) -> TlsMode {
    match entry.map(|e| e.ssl_mode) {
        Some(stored) if (stored == TlsMode::None) == (tree == TlsMode::None) => stored,
        _ => tree,
    }
}

fn redirect_from_route(route: &Route, overlay: &MetadataSnapshot) -> Option<Redirect> {
    let id = route.id().filter(|id| id.starts_with(REDIRECT_ID_PREFIX))?;

    let mut code = None;
    let mut location = None;
    for handler in route.handlers() {
        match handler {
            Handler::StaticResponse(sr) => {
                if let Some(c) = sr
                    .status_code
                    .as_ref()
                    .and_then(|s| s.as_u16())
                    .filter(|c| (301..=302).contains(c))
                {
                    code = Some(c);
                }
            }
            Handler::Headers(h) => {
                if let Some(loc) = h.response.as_ref().and_then(|r| r.first("Location")) {
                    location = Some(loc);
                }
            }
            _ => {}
        }
    }

    let code = code?;
    let location = location.filter(|l| !l.is_empty())?;
    let (destination, preserve_path) = match location.strip_suffix(PATH_PLACEHOLDER) {
        Some(base) => (base, true),
        None => (location, false),
    };

    let hosts: Vec<String> = route.hosts().map(String::from).collect();
    let mut redirect = Redirect::created_at(
        hosts.clone(),
        destination,
        code,
        preserve_path,
        DateTime::<Utc>::UNIX_EPOCH,
    );
    redirect.id = id.to_string();

    if let Some(entry) = overlay.redirects.get(id) {
        entry.apply_to(&mut redirect);
        // Verbatim list only if its host-matchable part is what the tree matches on
        let matchable: Vec<&String> = entry
            .source_domains
            .iter()
            .filter(|d| !has_explicit_port(d))
            .collect();
        if !matchable.iter().copied().eq(hosts.iter()) {
            redirect.source_domains = hosts;
        }
    }

    Some(redirect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpm_core::{RedirectMetadata, RouteStatus};
    use serde_json::json;

    fn tree(value: serde_json::Value) -> CaddyConfig {
        serde_json::from_value(value).unwrap()
    }

    fn rp_route(id: &str, host: Option<&str>, dial: &str) -> serde_json::Value {
        let mut route = json!({
            "@id": id,
            "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": dial}]}]
        });
        if let Some(host) = host {
            route["match"] = json!([{"host": [host]}]);
        }
        route
    }

    #[test]
    fn test_proxy_without_overlay_uses_defaults() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "https_enabled": {
                "listen": [":80", ":443"],
                "routes": [rp_route("proxy_a_com_1700000000", Some("a.com"), "api:443")]
            }
        }}}}));

        let proxies = parse_proxies(&config, &MetadataSnapshot::default());
        assert_eq!(proxies.len(), 1);
        let p = &proxies[0];
        assert_eq!(p.domain, "a.com");
        assert_eq!(p.target_url, "https://api:443");
        assert_eq!(p.ssl_mode, TlsMode::Auto);
        assert_eq!(p.status, RouteStatus::Active);
        assert_eq!(p.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_overlay_refines_consistent_fields() {
        let original = {
            let mut p = Proxy::new("a.com", "localhost:3000", TlsMode::Custom);
            p.custom_headers.insert("X-A".into(), "1".into());
            p
        };
        let mut overlay = MetadataSnapshot::default();
        overlay
            .proxies
            .insert(original.id.clone(), ProxyMetadata::from(&original));

        let config = tree(json!({"apps": {"http": {"servers": {
            "https_enabled": {
                "listen": [":80", ":443"],
                "routes": [rp_route(&original.id, Some("a.com"), "localhost:3000")]
            }
        }}}}));

        let p = &parse_proxies(&config, &overlay)[0];
        assert_eq!(p.target_url, "localhost:3000");
        assert_eq!(p.ssl_mode, TlsMode::Custom);
        assert_eq!(p.custom_headers, original.custom_headers);
        assert_eq!(p.created_at, original.created_at);
    }

    #[test]
    fn test_tree_wins_over_stale_overlay() {
        let stale = Proxy::new("a.com", "localhost:3000", TlsMode::Auto);
        let mut overlay = MetadataSnapshot::default();
        overlay
            .proxies
            .insert(stale.id.clone(), ProxyMetadata::from(&stale));

        let config = tree(json!({"apps": {"http": {"servers": {
            "http_only": {
                "listen": [":80"],
                "automatic_https": {"disable": true},
                "routes": [rp_route(&stale.id, Some("a.com"), "localhost:4000")]
            }
        }}}}));

        let p = &parse_proxies(&config, &overlay)[0];
        assert_eq!(p.target_url, "http://localhost:4000");
        assert_eq!(p.ssl_mode, TlsMode::None);
    }

    #[test]
    fn test_port_domain_falls_back_to_overlay_then_id() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "http_only": {
                "listen": [":80", ":9801"],
                "routes": [
                    rp_route("proxy_localhost_9801_1755490936", None, "localhost:3000"),
                    rp_route("proxy_my_host_8080_1755490936", None, "localhost:3001")
                ]
            }
        }}}}));

        let mut with_entry = Proxy::created_at(
            "my_host:8080",
            "localhost:3001",
            TlsMode::None,
            DateTime::from_timestamp(1_755_490_936, 0).unwrap(),
        );
        with_entry.id = "proxy_my_host_8080_1755490936".into();
        let mut overlay = MetadataSnapshot::default();
        overlay
            .proxies
            .insert(with_entry.id.clone(), ProxyMetadata::from(&with_entry));

        let proxies = parse_proxies(&config, &overlay);
        assert_eq!(proxies[0].domain, "localhost:9801");
        assert_eq!(proxies[1].domain, "my_host:8080");
    }

    #[test]
    fn test_ip_lists_are_recovered() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "https_enabled": {
                "listen": [":80", ":443"],
                "routes": [
                    {
                        "@id": "proxy_a_com_1",
                        "match": [{"host": ["a.com"], "remote_ip": {"ranges": ["10.0.0.0/8"]}}],
                        "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "x:1"}]}]
                    },
                    {
                        "@id": "proxy_b_com_1",
                        "match": [{"host": ["b.com"], "not": [{"remote_ip": {"ranges": ["1.2.3.4"]}}]}],
                        "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "x:2"}]}]
                    }
                ]
            }
        }}}}));

        let proxies = parse_proxies(&config, &MetadataSnapshot::default());
        assert_eq!(proxies[0].allowed_ips, vec!["10.0.0.0/8"]);
        assert!(proxies[0].blocked_ips.is_empty());
        assert_eq!(proxies[1].blocked_ips, vec!["1.2.3.4"]);
    }

    #[test]
    fn test_skips_foreign_routes() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "srv0": {
                "listen": [":443"],
                "routes": [
                    {"handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "x:1"}]}]},
                    {"@id": "files", "handle": [{"handler": "file_server"}]}
                ]
            }
        }}}}));

        assert!(parse_proxies(&config, &MetadataSnapshot::default()).is_empty());
        assert!(parse_redirects(&config, &MetadataSnapshot::default()).is_empty());
    }

    #[test]
    fn test_redirect_reconstruction() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "https_enabled": {
                "listen": [":80", ":443"],
                "routes": [{
                    "@id": "redirect_old_com_1700000000",
                    "match": [{"host": ["old.com"]}, {"host": ["www.old.com"]}],
                    "handle": [
                        {"handler": "headers", "response": {"set": {"Location": ["https://new.com{http.request.uri}"]}}},
                        {"handler": "static_response", "status_code": 301}
                    ]
                }]
            }
        }}}}));

        let redirects = parse_redirects(&config, &MetadataSnapshot::default());
        assert_eq!(redirects.len(), 1);
        let r = &redirects[0];
        assert_eq!(r.id, "redirect_old_com_1700000000");
        assert_eq!(r.destination_url, "https://new.com");
        assert!(r.preserve_path);
        assert_eq!(r.redirect_code, 301);
        assert_eq!(r.source_domains, vec!["old.com", "www.old.com"]);
    }

    #[test]
    fn test_redirect_overlay_restores_port_domains() {
        let original = Redirect::new(
            vec!["old.com".into(), "old.com:8080".into()],
            "https://new.com",
            302,
            false,
        );
        let route = crate::builder::build_redirect_route(&original);
        let mut config = CaddyConfig::default();
        config
            .servers_mut()
            .entry("https_enabled".into())
            .or_default()
            .routes
            .push(route);

        let mut overlay = MetadataSnapshot::default();
        overlay
            .redirects
            .insert(original.id.clone(), RedirectMetadata::from(&original));

        let r = &parse_redirects(&config, &overlay)[0];
        assert_eq!(r.source_domains, original.source_domains);
        assert_eq!(r.created_at, original.created_at);
        assert!(!r.preserve_path);
    }

    #[test]
    fn test_redirect_needs_location_and_code() {
        let config = tree(json!({"apps": {"http": {"servers": {
            "https_enabled": {
                "listen": [":443"],
                "routes": [
                    {"@id": "redirect_a_1", "handle": [{"handler": "static_response", "status_code": 301}]},
                    {"@id": "redirect_b_1", "handle": [
                        {"handler": "headers", "response": {"set": {"Location": ["https://x"]}}},
                        {"handler": "static_response", "status_code": 404}
                    ]}
                ]
            }
        }}}}));

        assert!(parse_redirects(&config, &MetadataSnapshot::default()).is_empty());
    }

    #[test]
    fn test_global_dns_provider() {
        let config = tree(json!({"apps": {
            "tls": {"certificate_authorities": {"acme": {
                "module": "acme",
                "challenges": {"dns": {"provider": {"name": "dns.providers.duckdns", "token": "t"}}}
            }}}
        }}));
        assert_eq!(global_dns_provider(&config).as_deref(), Some("duckdns"));
        assert_eq!(global_dns_provider(&CaddyConfig::default()), None);
    }
}
