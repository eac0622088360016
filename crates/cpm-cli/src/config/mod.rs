//! Configuration management.

use anyhow::{Context as _, Result};
use cpm::metadata::metadata_path_for;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::OutputFormat;

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "caddy-config.json";

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caddy admin API endpoint.
    pub admin_url: String,

    /// Directory holding the configuration snapshot and metadata.
    pub data_dir: PathBuf,

    /// Admin request timeout in seconds.
    pub timeout_secs: u64,

    /// Default output format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_url: cpm::DEFAULT_ADMIN_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            timeout_secs: cpm::DEFAULT_TIMEOUT.as_secs(),
            output_format: None,
        }
    }
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "caddyproxymanager", "cpm")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default file, or defaults if it is absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults if it is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to the default file.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Apply command-line and environment overrides.
    #[must_use]
    pub fn with_overrides(mut self, admin_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = admin_url {
            self.admin_url = url;
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    /// Where the last pushed configuration is saved.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// Where proxy and redirect metadata is saved.
    pub fn metadata_path(&self) -> PathBuf {
        metadata_path_for(&self.snapshot_path())
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.admin_url, "http://localhost:2019");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.snapshot_path(), PathBuf::from("./data/caddy-config.json"));
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("./data/caddy-config-metadata.json")
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "admin_url = \"http://caddy:2019\"\noutput_format = \"json\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.admin_url, "http://caddy:2019");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.output_format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default().with_overrides(
            Some("http://10.0.0.2:2019".into()),
            Some(PathBuf::from("/var/lib/cpm")),
        );
        assert_eq!(config.admin_url, "http://10.0.0.2:2019");
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/var/lib/cpm/caddy-config.json")
        );

        let untouched = Config::default().with_overrides(None, None);
        assert_eq!(untouched, Config::default());
    }
}
