//! Persistent overlay for proxy and redirect fields the Caddy tree cannot hold.
//!
//! Readers get an immutable [`Arc`] snapshot. Writers clone-on-write under the
//! lock, so a snapshot handed out earlier never changes underneath its holder.
//! Mutations are in memory only until [`MetadataStore::flush`] succeeds.

use cpm_core::{MetadataSnapshot, Proxy, ProxyMetadata, Redirect, RedirectMetadata, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Side table keyed by route id
#[derive(Debug, Default)]
pub struct MetadataStore {
    path: Option<PathBuf>,
    state: RwLock<Arc<MetadataSnapshot>>,
    flush_lock: Mutex<()>,
}

impl MetadataStore {
    /// Store that is never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store from `path`; a missing file gives an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => MetadataSnapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetadataSnapshot::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(
            path = %path.display(),
            proxies = snapshot.proxies.len(),
            redirects = snapshot.redirects.len(),
            "loaded metadata"
        );

        Ok(Self {
            path: Some(path),
            state: RwLock::new(Arc::new(snapshot)),
            flush_lock: Mutex::new(()),
        })
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current contents
    pub async fn snapshot(&self) -> Arc<MetadataSnapshot> {
        Arc::clone(&*self.state.read().await)
    }

    /// Entry for a proxy id
    pub async fn proxy(&self, id: &str) -> Option<ProxyMetadata> {
        self.state.read().await.proxies.get(id).cloned()
    }

    /// Insert or wholesale replace the entry for `proxy`
    pub async fn set_proxy(&self, proxy: &Proxy) {
        let entry = ProxyMetadata::from(proxy);
        let mut state = self.state.write().await;
        Arc::make_mut(&mut state)
            .proxies
            .insert(entry.id.clone(), entry);
    }

    /// Remove the entry for a proxy id
    pub async fn delete_proxy(&self, id: &str) -> Option<ProxyMetadata> {
        let mut state = self.state.write().await;
        if !state.proxies.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut state).proxies.remove(id)
    }

    /// Copy stored fields onto `proxy`; returns false when no entry exists
    pub async fn apply_to_proxy(&self, proxy: &mut Proxy) -> bool {
        match self.state.read().await.proxies.get(&proxy.id) {
            Some(entry) => {
                entry.apply_to(proxy);
                true
            }
            None => false,
        }
    }

    /// Entry for a redirect id
    pub async fn redirect(&self, id: &str) -> Option<RedirectMetadata> {
        self.state.read().await.redirects.get(id).cloned()
    }

    /// Insert or wholesale replace the entry for `redirect`
    pub async fn set_redirect(&self, redirect: &Redirect) {
        let entry = RedirectMetadata::from(redirect);
        let mut state = self.state.write().await;
        Arc::make_mut(&mut state)
            .redirects
            .insert(entry.id.clone(), entry);
    }

    /// Remove the entry for a redirect id
    pub async fn delete_redirect(&self, id: &str) -> Option<RedirectMetadata> {
        let mut state = self.state.write().await;
        if !state.redirects.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut state).redirects.remove(id)
    }

    /// Write the whole store to its file (temp file, then rename).
    ///
    /// No-op for an in-memory store. The file holds basic auth passwords
    /// in plaintext and is created owner-only on unix.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = self.flush_lock.lock().await;
        let snapshot = self.snapshot().await;
        let json = serde_json::to_vec_pretty(&*snapshot)?;

        write_private(path, &json).await?;
        debug!(path = %path.display(), bytes = json.len(), "flushed metadata");
        Ok(())
    }
}

/// Replace `path` atomically with `contents`, mode 0600 on unix
pub(crate) async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    tokio::fs::rename(&tmp, path).await
}

/// Overlay file that sits next to a config snapshot:
/// `<dir>/<stem>-metadata.json`
#[must_use]
pub fn metadata_path_for(snapshot: &Path) -> PathBuf {
    let stem = snapshot
        .file_stem()
        .map_or_else(|| "caddy-config".into(), |s| s.to_string_lossy());
    snapshot.with_file_name(format!("{stem}-metadata.json"))
}
