//! Whole-document reads and writes of the live configuration, with a local
//! snapshot for crash recovery.

use crate::metadata::write_private;
use cpm_client::AdminClient;
use cpm_core::{CaddyConfig, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Admin API access plus the on-disk copy of the last pushed tree
#[derive(Debug, Clone)]
pub struct ConfigTransport {
    client: AdminClient,
    snapshot_path: Option<PathBuf>,
}

impl ConfigTransport {
    /// Create a transport; without a snapshot path nothing is written locally
    #[must_use]
    pub const fn new(client: AdminClient, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            client,
            snapshot_path,
        }
    }

    /// Underlying admin client
    #[must_use]
    pub const fn client(&self) -> &AdminClient {
        &self.client
    }

    /// Snapshot file, if configured
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Fetch the live tree
    pub async fn fetch(&self) -> Result<CaddyConfig> {
        self.client.get_config().await
    }

    /// Push `config` as the whole live tree, then snapshot it.
    ///
    /// A failed snapshot is logged and does not fail the call; Caddy has
    /// already accepted the document at that point.
    pub async fn replace(&self, config: &CaddyConfig) -> Result<()> {
        self.client.load(config).await?;
        debug!(routes = config.route_count(), "configuration loaded");

        if let Err(e) = self.save_snapshot(config).await {
            warn!(error = %e, "failed to save configuration snapshot");
        }
        Ok(())
    }

    /// Write `config` to the snapshot file as pretty JSON
    pub async fn save_snapshot(&self, config: &CaddyConfig) -> Result<()> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(config)?;
        write_private(path, &json).await?;
        Ok(())
    }

    /// Read the snapshot file; `None` if unset or absent
    pub async fn load_snapshot(&self) -> Result<Option<CaddyConfig>> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(None);
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Push the snapshot verbatim, if one exists. Returns whether it did.
    pub async fn restore_from_snapshot(&self) -> Result<bool> {
        let Some(config) = self.load_snapshot().await? else {
            debug!("no configuration snapshot to restore");
            return Ok(false);
        };

        self.client.load(&config).await?;
        info!(
            routes = config.route_count(),
            path = ?self.snapshot_path,
            "restored configuration from snapshot"
        );
        Ok(true)
    }
}
