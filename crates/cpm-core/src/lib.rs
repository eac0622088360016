//! Core types for the Caddy proxy manager.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - **Domain model**: [`Proxy`] and [`Redirect`] as users describe them
//! - **Caddy tree**: a typed, loss-free view of the admin API's JSON document
//! - **Overlay entries**: fields the Caddy tree cannot represent
//! - **Errors**: [`CpmError`] and the pre-mutation [`ValidationError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use cpm_core::{Proxy, TlsMode};
//!
//! let mut proxy = Proxy::new("app.example.com", "localhost:3000", TlsMode::Auto);
//! proxy.allowed_ips.push("10.0.0.0/8".into());
//! proxy.validate()?;
//! ```

mod error;
pub mod types;
pub mod validate;

pub use error::{CpmError, Result, ValidationError};
pub use types::*;
