//! Placement of routes into the two managed server buckets.
//!
//! TLS mode `none` proxies live in [`HTTP_ONLY_SERVER`], which listens on
//! `:80` with automatic HTTPS disabled. Everything else, redirects included,
//! lives in [`HTTPS_SERVER`] on `:80` and `:443`. Ports embedded in a domain
//! are added to the bucket's listeners.

use cpm_core::validate::domain_port;
use cpm_core::{
    AutomaticHttps, CaddyConfig, Extra, Proxy, Redirect, Route, Server, TlsMode, TlsPolicy,
    HTTPS_SERVER, HTTP_ONLY_SERVER,
};
use tracing::debug;

/// Bucket and listener requirements for one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Server bucket name
    pub bucket: &'static str,

    /// Listeners the bucket must have, in order
    pub listen: Vec<String>,

    /// Whether the bucket must have automatic HTTPS disabled
    pub disable_automatic_https: bool,
}

impl Placement {
    /// Placement for a proxy, by TLS mode
    #[must_use]
    pub fn for_proxy(proxy: &Proxy) -> Self {
        let http_only = proxy.ssl_mode == TlsMode::None;
        let mut listen = base_ports(http_only);
        add_embedded_port(&mut listen, &proxy.domain);

        Self {
            bucket: if http_only {
                HTTP_ONLY_SERVER
            } else {
                HTTPS_SERVER
            },
            listen,
            disable_automatic_https: http_only,
        }
    }

    /// Placement for a redirect; always the HTTPS bucket
    #[must_use]
    pub fn for_redirect(redirect: &Redirect) -> Self {
        let mut listen = base_ports(false);
        for domain in &redirect.source_domains {
            add_embedded_port(&mut listen, domain);
        }

        Self {
            bucket: HTTPS_SERVER,
            listen,
            disable_automatic_https: false,
        }
    }
}

/// A route taken out of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedRoute {
    /// Bucket it was in
    pub bucket: String,

    /// Its position within the bucket
    pub index: usize,

    /// The route itself
    pub route: Route,
}

/// Add a route to its bucket, creating the bucket if needed.
///
/// Listeners are unioned, and `policy` (if any) is appended to the bucket's
/// TLS policies. With `position`, the route is inserted there instead of
/// appended.
pub fn insert_route(
    config: &mut CaddyConfig,
    placement: &Placement,
    route: Route,
    policy: Option<TlsPolicy>,
    position: Option<usize>,
) {
    let server = config
        .servers_mut()
        .entry(placement.bucket.to_string())
        .or_insert_with(Server::default);

    for port in &placement.listen {
        if !server.listens_on(port) {
            server.listen.push(port.clone());
        }
    }

    if placement.disable_automatic_https && !server.automatic_https_disabled() {
        server
            .automatic_https
            .get_or_insert_with(|| AutomaticHttps {
                disable: true,
                extra: Extra::new(),
            })
            .disable = true;
    }

    match position {
        Some(index) if index <= server.routes.len() => server.routes.insert(index, route),
        _ => server.routes.push(route),
    }

    if let Some(policy) = policy {
        server.tls_policies.push(policy);
    }

    debug!(
        bucket = placement.bucket,
        routes = server.routes.len(),
        "route placed"
    );
}

/// Remove the route with `id` from whichever bucket holds it.
///
/// Per-domain TLS policies for the route's domains (its host matchers plus
/// `domains`) are dropped unless another route in the bucket still matches
/// that host. A bucket left without routes is deleted.
pub fn remove_route(config: &mut CaddyConfig, id: &str, domains: &[String]) -> Option<RemovedRoute> {
    let removed = take_route(config, id, domains)?;
    prune_bucket(config, &removed.bucket);
    Some(removed)
}

/// [`remove_route`] without deleting an emptied bucket, so the route's
/// replacement can go back into the same server with its settings intact
pub fn take_route(config: &mut CaddyConfig, id: &str, domains: &[String]) -> Option<RemovedRoute> {
    let (bucket, index) = config.servers().iter().find_map(|(name, server)| {
        server
            .routes
            .iter()
            .position(|r| r.id() == Some(id))
            .map(|i| (name.clone(), i))
    })?;

    let server = config.servers_mut().get_mut(&bucket)?;
    let route = server.routes.remove(index);

    let mut stale: Vec<String> = route.hosts().map(String::from).collect();
    stale.extend(domains.iter().cloned());
    stale.retain(|domain| !server.routes.iter().any(|r| r.hosts().any(|h| h == domain)));
    server
        .tls_policies
        .retain(|p| !matches!(p.sni(), [only] if stale.contains(only)));

    Some(RemovedRoute {
        bucket,
        index,
        route,
    })
}

/// Delete `bucket` if it has no routes left
pub fn prune_bucket(config: &mut CaddyConfig, bucket: &str) {
    if config
        .servers()
        .get(bucket)
        .is_some_and(|s| s.routes.is_empty())
    {
        debug!(bucket, "removing empty bucket");
        config.servers_mut().remove(bucket);
    }
}

fn base_ports(http_only: bool) -> Vec<String> {
    if http_only {
        vec![":80".to_string()]
    } else {
        vec![":80".to_string(), ":443".to_string()]
    }
}

fn add_embedded_port(listen: &mut Vec<String>, domain: &str) {
    if let Some(port) = domain_port(domain) {
        let addr = format!(":{port}");
        if !listen.contains(&addr) {
            listen.push(addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpm_core::{MatcherSet, TlsMatch};

    fn route(id: &str, host: Option<&str>) -> Route {
        Route {
            id: Some(id.to_string()),
            matchers: host.map(MatcherSet::host).into_iter().collect(),
            ..Route::default()
        }
    }

    fn policy(domain: &str) -> TlsPolicy {
        TlsPolicy {
            matcher: Some(TlsMatch {
                sni: vec![domain.to_string()],
                extra: Extra::new(),
            }),
            ..TlsPolicy::default()
        }
    }

    #[test]
    fn test_tls_none_bucket() {
        let proxy = Proxy::new("plain.example.com", "localhost:3000", TlsMode::None);
        let placement = Placement::for_proxy(&proxy);
        let mut config = CaddyConfig::default();
        insert_route(&mut config, &placement, route("a", Some("plain.example.com")), None, None);

        let server = &config.servers()[HTTP_ONLY_SERVER];
        assert_eq!(server.listen, vec![":80"]);
        assert!(!server.listens_on(":443"));
        assert!(server.automatic_https_disabled());
    }

    #[test]
    fn test_embedded_ports_are_listened_on() {
        let proxy = Proxy::new("localhost:9801", "localhost:3000", TlsMode::None);
        assert_eq!(Placement::for_proxy(&proxy).listen, vec![":80", ":9801"]);

        let secure = Proxy::new("app.example.com:8443", "localhost:3000", TlsMode::Auto);
        let placement = Placement::for_proxy(&secure);
        assert_eq!(placement.bucket, HTTPS_SERVER);
        assert_eq!(placement.listen, vec![":80", ":443", ":8443"]);
        assert!(!placement.disable_automatic_https);
    }

    #[test]
    fn test_redirects_use_https_bucket() {
        let redirect = Redirect::new(
            vec!["old.com".into(), "old.com:8080".into()],
            "https://new.com",
            301,
            false,
        );
        let placement = Placement::for_redirect(&redirect);
        assert_eq!(placement.bucket, HTTPS_SERVER);
        assert_eq!(placement.listen, vec![":80", ":443", ":8080"]);
    }

    #[test]
    fn test_listeners_are_unioned() {
        let mut config = CaddyConfig::default();
        let a = Proxy::new("a.com:8443", "localhost:1", TlsMode::Auto);
        let b = Proxy::new("b.com", "localhost:2", TlsMode::Custom);
        insert_route(&mut config, &Placement::for_proxy(&a), route("a", None), None, None);
        insert_route(&mut config, &Placement::for_proxy(&b), route("b", Some("b.com")), None, None);

        let server = &config.servers()[HTTPS_SERVER];
        assert_eq!(server.listen, vec![":80", ":443", ":8443"]);
        assert_eq!(server.routes.len(), 2);
        assert!(server.automatic_https.is_none());
    }

    #[test]
    fn test_remove_last_route_deletes_bucket() {
        let mut config = CaddyConfig::default();
        let placement = Placement::for_proxy(&Proxy::new("a.com", "x:1", TlsMode::None));
        insert_route(&mut config, &placement, route("a", Some("a.com")), None, None);

        let removed = remove_route(&mut config, "a", &[]).unwrap();
        assert_eq!(removed.bucket, HTTP_ONLY_SERVER);
        assert!(config.servers().is_empty());
        assert!(remove_route(&mut config, "a", &[]).is_none());
    }

    #[test]
    fn test_remove_drops_stale_policies_only() {
        let mut config = CaddyConfig::default();
        let placement = Placement::for_proxy(&Proxy::new("a.com", "x:1", TlsMode::Auto));
        insert_route(&mut config, &placement, route("a", Some("a.com")), Some(policy("a.com")), None);
        insert_route(&mut config, &placement, route("b", Some("b.com")), Some(policy("b.com")), None);
        insert_route(&mut config, &placement, route("b2", Some("b.com")), None, None);

        remove_route(&mut config, "a", &[]).unwrap();
        remove_route(&mut config, "b", &[]).unwrap();

        let server = &config.servers()[HTTPS_SERVER];
        assert_eq!(server.tls_policies.len(), 1);
        assert_eq!(server.tls_policies[0].sni(), ["b.com"]);
    }

    #[test]
    fn test_remove_uses_domain_hint_for_port_domains() {
        let mut config = CaddyConfig::default();
        let placement = Placement::for_proxy(&Proxy::new("a.com:8443", "x:1", TlsMode::Auto));
        insert_route(&mut config, &placement, route("a", None), Some(policy("a.com:8443")), None);
        insert_route(&mut config, &placement, route("keep", Some("z.com")), None, None);

        remove_route(&mut config, "a", &["a.com:8443".to_string()]).unwrap();
        assert!(config.servers()[HTTPS_SERVER].tls_policies.is_empty());
    }

    #[test]
    fn test_take_keeps_bucket_settings() {
        let mut config = CaddyConfig::default();
        let placement = Placement::for_proxy(&Proxy::new("a.com", "x:1", TlsMode::None));
        insert_route(&mut config, &placement, route("a", Some("a.com")), None, None);
        config
            .servers_mut()
            .get_mut(HTTP_ONLY_SERVER)
            .unwrap()
            .extra
            .insert("logs".into(), serde_json::json!({}));

        let removed = take_route(&mut config, "a", &[]).unwrap();
        assert!(config.servers()[HTTP_ONLY_SERVER].routes.is_empty());
        insert_route(&mut config, &placement, removed.route, None, Some(removed.index));
        prune_bucket(&mut config, HTTP_ONLY_SERVER);

        let server = &config.servers()[HTTP_ONLY_SERVER];
        assert_eq!(server.routes.len(), 1);
        assert!(server.extra.contains_key("logs"));
    }

    #[test]
    fn test_insert_at_position() {
        let mut config = CaddyConfig::default();
        let placement = Placement::for_proxy(&Proxy::new("a.com", "x:1", TlsMode::Auto));
        for id in ["a", "b", "c"] {
            insert_route(&mut config, &placement, route(id, None), None, None);
        }

        let removed = take_route(&mut config, "b", &[]).unwrap();
        insert_route(&mut config, &placement, route("b", None), None, Some(removed.index));
        prune_bucket(&mut config, &removed.bucket);

        let ids: Vec<_> = config.servers()[HTTPS_SERVER]
            .routes
            .iter()
            .filter_map(Route::id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
