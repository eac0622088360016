//! Route synthesis from proxy and redirect definitions.

use crate::target::{resolve_target, ResolvedTarget};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use cpm_core::validate::{clean_ip_list, has_explicit_port};
use cpm_core::{
    Account, AuthProviders, AuthenticationHandler, BasicAuth, CpmError, Extra, Handler,
    HashAlgorithm, HeaderOp, HeaderOps, HeadersHandler, HttpBasicProvider, MatcherSet, Module,
    Proxy, Redirect, RemoteIpMatch, ReverseProxyHandler, Result, Route, StaticResponseHandler,
    StatusCode, Transport, Upstream,
};
use std::collections::BTreeMap;

/// Hash algorithm named in the `http_basic` provider.
///
/// Caddy releases before 2.10 only accept `bcrypt` here and reject the load.
pub const PASSWORD_HASH_ALGORITHM: &str = "argon2id";

/// Build the route for a proxy: optional basic auth, then the reverse proxy.
///
/// Fails on an unparseable target or if password hashing fails.
pub fn build_proxy_route(proxy: &Proxy) -> Result<Route> {
    let target = resolve_target(&proxy.target_url)?;

    let mut handle: Vec<Module<Handler>> = Vec::with_capacity(2);
    if let Some(auth) = proxy.basic_auth.as_ref().filter(|a| a.is_active()) {
        handle.push(Handler::Authentication(basic_auth_handler(auth)?).into());
    }
    handle.push(Handler::ReverseProxy(reverse_proxy_handler(proxy, &target)).into());

    Ok(Route {
        id: Some(proxy.id.clone()),
        matchers: proxy_matchers(proxy),
        handle,
        extra: Extra::new(),
    })
}

/// Build the route for a redirect: set `Location`, then answer with the code
#[must_use]
pub fn build_redirect_route(redirect: &Redirect) -> Route {
    let mut location = HeaderOp::default();
    location
        .set
        .insert("Location".to_string(), vec![redirect.location()]);

    let headers = HeadersHandler {
        response: Some(location),
        ..HeadersHandler::default()
    };
    let respond = StaticResponseHandler {
        status_code: Some(StatusCode::Code(redirect.redirect_code)),
        ..StaticResponseHandler::default()
    };

    let mut matchers: Vec<MatcherSet> = redirect
        .source_domains
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty() && !has_explicit_port(d))
        .map(MatcherSet::host)
        .collect();

    // Port-qualified sources only: match everything on the listener
    if matchers.is_empty() {
        matchers.push(MatcherSet::default());
    }

    Route {
        id: Some(redirect.id.clone()),
        matchers,
        handle: vec![
            Handler::Headers(headers).into(),
            Handler::StaticResponse(respond).into(),
        ],
        extra: Extra::new(),
    }
}

/// One-way hash a basic auth password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CpmError::Hash(e.to_string()))
}

fn basic_auth_handler(auth: &BasicAuth) -> Result<AuthenticationHandler> {
    let account = Account {
        username: auth.username.clone(),
        password: hash_password(&auth.password)?,
        extra: Extra::new(),
    };

    Ok(AuthenticationHandler {
        providers: AuthProviders {
            http_basic: Some(HttpBasicProvider {
                hash: Some(HashAlgorithm {
                    algorithm: PASSWORD_HASH_ALGORITHM.to_string(),
                    extra: Extra::new(),
                }),
                accounts: vec![account],
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        },
        extra: Extra::new(),
    })
}

fn reverse_proxy_handler(proxy: &Proxy, target: &ResolvedTarget) -> ReverseProxyHandler {
    let mut set = BTreeMap::new();
    set.insert("Host".to_string(), vec![target.host.clone()]);
    for (name, value) in &proxy.custom_headers {
        set.insert(name.clone(), vec![value.clone()]);
    }

    let transport = target.tls.then(|| Transport {
        protocol: "http".to_string(),
        tls: Some(Extra::new()),
        extra: Extra::new(),
    });

    ReverseProxyHandler {
        upstreams: vec![Upstream {
            dial: target.dial.clone(),
            extra: Extra::new(),
        }],
        transport,
        headers: Some(HeaderOps {
            request: Some(HeaderOp {
                set,
                extra: Extra::new(),
            }),
            ..HeaderOps::default()
        }),
        extra: Extra::new(),
    }
}

/// Host and client-address matchers.
///
/// An allow list wins over a block list. A port-qualified domain cannot be
/// host-matched, so without IP lists it gets no matcher at all.
fn proxy_matchers(proxy: &Proxy) -> Vec<MatcherSet> {
    let base = if has_explicit_port(&proxy.domain) {
        MatcherSet::default()
    } else {
        MatcherSet::host(&proxy.domain)
    };

    let allowed = clean_ip_list(&proxy.allowed_ips);
    if !allowed.is_empty() {
        return vec![MatcherSet {
            remote_ip: Some(remote_ip(allowed)),
            ..base
        }];
    }

    let blocked = clean_ip_list(&proxy.blocked_ips);
    if !blocked.is_empty() {
        return vec![MatcherSet {
            not: vec![MatcherSet {
                remote_ip: Some(remote_ip(blocked)),
                ..MatcherSet::default()
            }],
            ..base
        }];
    }

    if base.host.is_empty() {
        Vec::new()
    } else {
        vec![base]
    }
}

fn remote_ip(ranges: Vec<String>) -> RemoteIpMatch {
    RemoteIpMatch {
        ranges,
        extra: Extra::new(),
    }
}
