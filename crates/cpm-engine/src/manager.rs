//! The proxy manager: validated, serialized read-modify-write cycles against
//! the live Caddy configuration, with the metadata overlay kept alongside.

use crate::buckets::{insert_route, prune_bucket, remove_route, take_route, Placement};
use crate::builder::{build_proxy_route, build_redirect_route};
use crate::dns::{plan_dns_challenge, set_global_issuer, DnsChallengePlan};
use crate::metadata::{metadata_path_for, MetadataStore};
use crate::reconcile::{parse_proxies, parse_redirects};
use crate::target::resolve_target;
use crate::transport::ConfigTransport;
use cpm_client::{AdminClient, DEFAULT_TIMEOUT};
use cpm_core::{
    CaddyConfig, CpmError, Proxy, Redirect, Result, Route, UpstreamStatus, ValidationError,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Manages proxies and redirects on one Caddy instance.
///
/// All tree mutations issued through one manager are serialized, so
/// concurrent calls cannot lose each other's updates. Writers outside this
/// manager are not coordinated with.
#[derive(Debug)]
pub struct ProxyManager {
    transport: ConfigTransport,
    metadata: MetadataStore,
    write_lock: Mutex<()>,
}

impl ProxyManager {
    /// Create a builder
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Assemble a manager from its parts
    #[must_use]
    pub fn new(transport: ConfigTransport, metadata: MetadataStore) -> Self {
        Self {
            transport,
            metadata,
            write_lock: Mutex::new(()),
        }
    }

    /// Config transport in use
    #[must_use]
    pub const fn transport(&self) -> &ConfigTransport {
        &self.transport
    }

    /// Metadata overlay in use
    #[must_use]
    pub const fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Fetch the live configuration tree
    pub async fn get_config(&self) -> Result<CaddyConfig> {
        self.transport.fetch().await
    }

    /// Add a proxy route. Nothing is pushed if validation fails.
    pub async fn add_proxy(&self, proxy: &Proxy) -> Result<()> {
        let (route, dns) = prepare_proxy(proxy)?;

        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;
        if config.find_route(&proxy.id).is_some() {
            return Err(ValidationError::DuplicateId(proxy.id.clone()).into());
        }

        place_proxy(&mut config, proxy, route, dns, None);
        self.transport.replace(&config).await?;

        self.metadata.set_proxy(proxy).await;
        self.flush_metadata().await;

        info!(id = %proxy.id, domain = %proxy.domain, target = %proxy.target_url, "proxy added");
        Ok(())
    }

    /// Replace an existing proxy route in a single read-modify-write.
    ///
    /// The id is kept, `created_at` is taken from the overlay when it has
    /// an entry, and `updated_at` is bumped. Returns the proxy as stored.
    pub async fn update_proxy(&self, proxy: &Proxy) -> Result<Proxy> {
        let (route, dns) = prepare_proxy(proxy)?;

        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;

        let previous = self.metadata.proxy(&proxy.id).await;
        let mut domains = vec![proxy.domain.clone()];
        domains.extend(previous.as_ref().map(|e| e.domain.clone()));

        let removed = take_route(&mut config, &proxy.id, &domains)
            .ok_or_else(|| CpmError::not_found(format!("proxy with ID {}", proxy.id)))?;

        let mut updated = proxy.clone();
        if let Some(entry) = &previous {
            updated.created_at = entry.created_at;
        }
        updated.touch();

        let position = (Placement::for_proxy(&updated).bucket == removed.bucket)
            .then_some(removed.index);
        place_proxy(&mut config, &updated, route, dns, position);
        prune_bucket(&mut config, &removed.bucket);

        self.transport.replace(&config).await?;

        self.metadata.set_proxy(&updated).await;
        self.flush_metadata().await;

        info!(id = %updated.id, domain = %updated.domain, "proxy updated");
        Ok(updated)
    }

    /// Remove a proxy route and its overlay entry
    pub async fn delete_proxy(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;

        let domains: Vec<String> = self
            .metadata
            .proxy(id)
            .await
            .map(|e| e.domain)
            .into_iter()
            .collect();

        remove_route(&mut config, id, &domains)
            .ok_or_else(|| CpmError::not_found(format!("route with ID {id}")))?;
        self.transport.replace(&config).await?;

        self.metadata.delete_proxy(id).await;
        self.flush_metadata().await;

        info!(id, "proxy deleted");
        Ok(())
    }

    /// Reconstruct proxies from `config`, overlaying stored metadata
    pub async fn parse_proxies_from_config(&self, config: &CaddyConfig) -> Vec<Proxy> {
        let overlay = self.metadata.snapshot().await;
        parse_proxies(config, &overlay)
    }

    /// Proxies in the live configuration
    pub async fn list_proxies(&self) -> Result<Vec<Proxy>> {
        let config = self.transport.fetch().await?;
        Ok(self.parse_proxies_from_config(&config).await)
    }

    /// One proxy from the live configuration
    pub async fn get_proxy(&self, id: &str) -> Result<Proxy> {
        self.list_proxies()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| CpmError::not_found(format!("proxy with ID {id}")))
    }

    /// Add a redirect route. Nothing is pushed if validation fails.
    pub async fn add_redirect(&self, redirect: &Redirect) -> Result<()> {
        redirect.validate()?;
        let route = build_redirect_route(redirect);

        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;
        if config.find_route(&redirect.id).is_some() {
            return Err(ValidationError::DuplicateId(redirect.id.clone()).into());
        }

        insert_route(&mut config, &Placement::for_redirect(redirect), route, None, None);
        self.transport.replace(&config).await?;

        self.metadata.set_redirect(redirect).await;
        self.flush_metadata().await;

        info!(
            id = %redirect.id,
            sources = ?redirect.source_domains,
            destination = %redirect.destination_url,
            "redirect added"
        );
        Ok(())
    }

    /// Replace an existing redirect route in a single read-modify-write
    pub async fn update_redirect(&self, redirect: &Redirect) -> Result<Redirect> {
        redirect.validate()?;
        let route = build_redirect_route(redirect);

        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;

        let removed = take_route(&mut config, &redirect.id, &[])
            .ok_or_else(|| CpmError::not_found(format!("redirect with ID {}", redirect.id)))?;

        let mut updated = redirect.clone();
        if let Some(entry) = self.metadata.redirect(&redirect.id).await {
            updated.created_at = entry.created_at;
        }
        updated.touch();

        let placement = Placement::for_redirect(&updated);
        let position = (placement.bucket == removed.bucket).then_some(removed.index);
        insert_route(&mut config, &placement, route, None, position);
        prune_bucket(&mut config, &removed.bucket);

        self.transport.replace(&config).await?;

        self.metadata.set_redirect(&updated).await;
        self.flush_metadata().await;

        info!(id = %updated.id, "redirect updated");
        Ok(updated)
    }

    /// Remove a redirect route and its overlay entry
    pub async fn delete_redirect(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.transport.fetch().await?;

        remove_route(&mut config, id, &[])
            .ok_or_else(|| CpmError::not_found(format!("redirect with ID {id}")))?;
        self.transport.replace(&config).await?;

        self.metadata.delete_redirect(id).await;
        self.flush_metadata().await;

        info!(id, "redirect deleted");
        Ok(())
    }

    /// Reconstruct redirects from `config`, overlaying stored metadata
    pub async fn parse_redirects_from_config(&self, config: &CaddyConfig) -> Vec<Redirect> {
        let overlay = self.metadata.snapshot().await;
        parse_redirects(config, &overlay)
    }

    /// Redirects in the live configuration
    pub async fn list_redirects(&self) -> Result<Vec<Redirect>> {
        let config = self.transport.fetch().await?;
        Ok(self.parse_redirects_from_config(&config).await)
    }

    /// Upstream counters reported by Caddy's reverse proxy module
    pub async fn upstream_status(&self) -> Result<Vec<UpstreamStatus>> {
        self.transport.client().upstreams().await
    }

    /// Push the live configuration back unchanged, forcing Caddy to
    /// re-provision it, and refresh the local snapshot
    pub async fn reload(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let config = self.transport.fetch().await?;
        self.transport.replace(&config).await?;
        info!(routes = config.route_count(), "configuration reloaded");
        Ok(())
    }

    /// Push the local snapshot, if any, as the live configuration
    pub async fn restore_from_snapshot(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.transport.restore_from_snapshot().await
    }

    async fn flush_metadata(&self) {
        if let Err(e) = self.metadata.flush().await {
            warn!(error = %e, "failed to save metadata");
        }
    }
}

/// Validate a proxy and build everything it contributes to the tree
fn prepare_proxy(proxy: &Proxy) -> Result<(Route, Option<DnsChallengePlan>)> {
    proxy.validate()?;
    resolve_target(&proxy.target_url)?;
    let dns = plan_dns_challenge(proxy)?;
    let route = build_proxy_route(proxy)?;
    Ok((route, dns))
}

fn place_proxy(
    config: &mut CaddyConfig,
    proxy: &Proxy,
    route: Route,
    dns: Option<DnsChallengePlan>,
    position: Option<usize>,
) {
    let placement = Placement::for_proxy(proxy);
    match dns {
        Some(plan) => {
            insert_route(config, &placement, route, Some(plan.policy), position);
            set_global_issuer(config, plan.issuer);
            debug!(domain = %proxy.domain, "configured DNS-01 challenge");
        }
        None => insert_route(config, &placement, route, None, position),
    }
}

/// Builder for a [`ProxyManager`]
#[derive(Debug, Clone)]
pub struct ManagerBuilder {
    client: Option<AdminClient>,
    admin_url: Option<String>,
    timeout: Duration,
    snapshot_path: Option<PathBuf>,
    metadata_path: Option<PathBuf>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    /// Builder targeting the default admin endpoint, with no local files
    #[must_use]
    pub const fn new() -> Self {
        Self {
            client: None,
            admin_url: None,
            timeout: DEFAULT_TIMEOUT,
            snapshot_path: None,
            metadata_path: None,
        }
    }

    /// Use an already configured admin client
    #[must_use]
    pub fn client(mut self, client: AdminClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Admin endpoint, ignored when a client is given
    #[must_use]
    pub fn admin_url(mut self, url: impl Into<String>) -> Self {
        self.admin_url = Some(url.into());
        self
    }

    /// Admin request timeout, ignored when a client is given
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where to snapshot the pushed configuration.
    ///
    /// Also places the metadata overlay next to it unless
    /// [`metadata_path`](Self::metadata_path) is set.
    #[must_use]
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Explicit metadata overlay file
    #[must_use]
    pub fn metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }

    /// Build the manager, loading the metadata overlay from disk
    pub async fn build(self) -> Result<ProxyManager> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = AdminClient::builder().timeout(self.timeout);
                if let Some(url) = self.admin_url {
                    builder = builder.base_url(url);
                }
                builder.build()?
            }
        };

        let metadata_path = self
            .metadata_path
            .or_else(|| self.snapshot_path.as_deref().map(metadata_path_for));
        let metadata = match metadata_path {
            Some(path) => MetadataStore::open(path).await?,
            None => MetadataStore::in_memory(),
        };

        debug!(
            admin = client.base_url(),
            snapshot = ?self.snapshot_path,
            metadata = ?metadata.path().map(Path::display),
            "proxy manager ready"
        );

        Ok(ProxyManager::new(
            ConfigTransport::new(client, self.snapshot_path),
            metadata,
        ))
    }
}
