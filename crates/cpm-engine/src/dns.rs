//! ACME DNS-01 challenge configuration.
//!
//! A proxy with TLS mode `auto` and challenge `dns` gets a per-domain TLS
//! policy whose ACME issuer solves the challenge through its DNS provider.
//! The same issuer is also written to the single global CA slot
//! `apps.tls.certificate_authorities["acme"]`; the last DNS proxy written
//! owns that slot.

use cpm_core::{
    AcmeIssuer, CaddyConfig, Challenges, CloudflareProvider, CredentialField,
    DigitalOceanProvider, DnsChallenge, DnsProvider, DnsProviderKind, DnsimpleProvider,
    DuckDnsProvider, Extra, GandiProvider, HetznerProvider, Issuer, Proxy, TlsApp, TlsMatch,
    TlsPolicy, ValidationError, DEFAULT_CA,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Per-domain policy plus the issuer for the global slot
#[derive(Debug, Clone, PartialEq)]
pub struct DnsChallengePlan {
    /// Server TLS policy scoped to the proxy's domain
    pub policy: TlsPolicy,

    /// ACME issuer for `apps.tls.certificate_authorities`
    pub issuer: Issuer,
}

/// Plan the DNS-01 configuration for a proxy, reading credentials from the
/// process environment when the proxy does not carry them.
///
/// Returns `Ok(None)` when the proxy does not use the DNS challenge.
pub fn plan_dns_challenge(proxy: &Proxy) -> Result<Option<DnsChallengePlan>, ValidationError> {
    plan_dns_challenge_with(proxy, |var| std::env::var(var).ok())
}

/// [`plan_dns_challenge`] with an explicit environment lookup
pub fn plan_dns_challenge_with<F>(
    proxy: &Proxy,
    env: F,
) -> Result<Option<DnsChallengePlan>, ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    if !proxy.uses_dns_challenge() {
        return Ok(None);
    }

    let kind = proxy
        .dns_provider_kind()?
        .ok_or(ValidationError::MissingDnsProvider)?;
    let provider = build_provider(kind, &proxy.dns_credentials, &env);
    let issuer = acme_issuer(provider);

    let policy = TlsPolicy {
        matcher: Some(TlsMatch {
            sni: vec![proxy.domain.clone()],
            extra: Extra::new(),
        }),
        issuers: vec![issuer.clone().into()],
        extra: Extra::new(),
    };

    Ok(Some(DnsChallengePlan { policy, issuer }))
}

/// Write the issuer into the global ACME slot, creating `apps.tls` if needed
pub fn set_global_issuer(config: &mut CaddyConfig, issuer: Issuer) {
    config
        .apps
        .tls
        .get_or_insert_with(TlsApp::default)
        .certificate_authorities
        .insert(DEFAULT_CA.to_string(), issuer.into());
}

/// Build the provider module for `kind`
pub fn build_provider<F>(
    kind: DnsProviderKind,
    credentials: &BTreeMap<String, String>,
    env: F,
) -> DnsProvider
where
    F: Fn(&str) -> Option<String>,
{
    let fields = kind.credentials();
    let value = |key: &str| {
        fields
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| resolve_credential(kind, f, credentials, &env))
            .unwrap_or_default()
    };

    match kind {
        DnsProviderKind::Cloudflare => DnsProvider::Cloudflare(CloudflareProvider {
            api_token: value("api_token"),
            email: Some(value("email")).filter(|e| !e.is_empty()),
            extra: Extra::new(),
        }),
        DnsProviderKind::DigitalOcean => DnsProvider::DigitalOcean(DigitalOceanProvider {
            auth_token: value("auth_token"),
            extra: Extra::new(),
        }),
        DnsProviderKind::DuckDns => DnsProvider::DuckDns(DuckDnsProvider {
            token: value("token"),
            extra: Extra::new(),
        }),
        DnsProviderKind::Hetzner => DnsProvider::Hetzner(HetznerProvider {
            api_token: value("api_token"),
            extra: Extra::new(),
        }),
        DnsProviderKind::Gandi => DnsProvider::Gandi(GandiProvider {
            bearer_token: value("bearer_token"),
            extra: Extra::new(),
        }),
        DnsProviderKind::Dnsimple => DnsProvider::Dnsimple(DnsimpleProvider {
            api_access_token: value("api_access_token"),
            extra: Extra::new(),
        }),
    }
}

/// Explicit credential, else the field's environment variable
fn resolve_credential<F>(
    kind: DnsProviderKind,
    field: &CredentialField,
    credentials: &BTreeMap<String, String>,
    env: &F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let found = credentials
        .get(field.key)
        .filter(|v| !v.is_empty())
        .cloned()
        .or_else(|| env(field.env).filter(|v| !v.is_empty()));

    if found.is_none() && field.required {
        warn!(
            provider = %kind,
            credential = field.key,
            env = field.env,
            "DNS provider credential not set"
        );
    }

    found
}

fn acme_issuer(provider: DnsProvider) -> Issuer {
    Issuer::Acme(AcmeIssuer {
        challenges: Some(Challenges {
            dns: Some(DnsChallenge {
                provider: provider.into(),
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        }),
        extra: Extra::new(),
    })
}
