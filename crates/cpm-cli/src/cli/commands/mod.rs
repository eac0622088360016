//! Command implementations.

pub mod config;
pub mod proxy;
pub mod redirect;
pub mod reload;
pub mod status;

use anyhow::Context as _;
use cpm::ProxyManager;

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration, overrides applied
    pub config: Config,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// Create a manager for the configured admin endpoint and data directory.
    pub async fn manager(&self) -> anyhow::Result<ProxyManager> {
        ProxyManager::builder()
            .admin_url(self.config.admin_url.as_str())
            .timeout(self.config.timeout())
            .snapshot_path(self.config.snapshot_path())
            .build()
            .await
            .with_context(|| {
                format!(
                    "failed to set up proxy manager for {} (data in {})",
                    self.config.admin_url,
                    self.config.data_dir.display()
                )
            })
    }
}
