//! # cpm-cli
//!
//! Command-line interface for managing reverse proxies and redirects on a
//! running Caddy server.
//!
//! ## Features
//!
//! - **Proxies**: add, update, list and delete reverse proxy routes
//! - **Redirects**: permanent or temporary redirects from one or more domains
//! - **Recovery**: push the last saved configuration back after a Caddy restart
//! - **Output formats**: colored tables or JSON

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
