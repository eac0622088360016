//! Manage reverse proxies and redirects on a running Caddy server.
//!
//! Routes are written straight into Caddy's live JSON configuration through
//! the admin API. Settings the configuration cannot carry (basic auth
//! credentials, health checks, timestamps) are kept in a local overlay file
//! next to a snapshot of the last pushed configuration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cpm::{Proxy, ProxyManager, TlsMode};
//!
//! #[tokio::main]
//! async fn main() -> cpm::Result<()> {
//!     let manager = ProxyManager::builder()
//!         .admin_url("http://localhost:2019")
//!         .snapshot_path("data/caddy-config.json")
//!         .build()
//!         .await?;
//!
//!     let proxy = Proxy::new("app.example.com", "localhost:3000", TlsMode::Auto);
//!     manager.add_proxy(&proxy).await?;
//!
//!     for proxy in manager.list_proxies().await? {
//!         println!("{} -> {}", proxy.domain, proxy.target_url);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for the admin connection
//! - `native-tls` - Use system native TLS

// Re-export core types
pub use cpm_core::*;

// Re-export the admin client
pub use cpm_client::{AdminClient, AdminClientBuilder, DEFAULT_ADMIN_URL, DEFAULT_TIMEOUT};

// Re-export the engine
pub use cpm_engine::{
    buckets, builder, dns, metadata, reconcile, target, transport, ConfigTransport,
    ManagerBuilder, MetadataStore, ProxyManager,
};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
