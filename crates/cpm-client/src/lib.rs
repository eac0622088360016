//! Async client for the Caddy admin API.
//!
//! [`AdminClient`] covers the three endpoints the proxy manager needs:
//! reading the live configuration, replacing it wholesale through `/load`,
//! and the reverse proxy upstream report.

mod client;

pub use client::{AdminClient, AdminClientBuilder, DEFAULT_ADMIN_URL, DEFAULT_TIMEOUT};
pub use cpm_core::{CpmError, Result};
