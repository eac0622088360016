//! Route synthesis and reconciliation for the Caddy proxy manager.
//!
//! The pieces, leaves first:
//!
//! - [`target`]: parse upstream targets into dial addresses
//! - [`builder`]: build routes from proxies and redirects
//! - [`buckets`]: place routes into the `http_only` / `https_enabled` servers
//! - [`dns`]: ACME DNS-01 policies and provider credentials
//! - [`metadata`]: the overlay store for fields the tree cannot carry
//! - [`reconcile`]: turn a live tree back into proxies and redirects
//! - [`transport`]: push/fetch the tree and keep a local snapshot
//!
//! [`ProxyManager`] ties them together.

pub mod buckets;
pub mod builder;
pub mod dns;
mod manager;
pub mod metadata;
pub mod reconcile;
pub mod target;
pub mod transport;

pub use manager::{ManagerBuilder, ProxyManager};
pub use metadata::MetadataStore;
pub use transport::ConfigTransport;
