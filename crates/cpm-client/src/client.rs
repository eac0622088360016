//! Caddy admin API client implementation.

use cpm_core::{CaddyConfig, CpmError, Result, UpstreamStatus};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Admin endpoint of a stock Caddy install
pub const DEFAULT_ADMIN_URL: &str = "http://localhost:2019";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Caddy admin endpoint
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("base_url", &self.inner.base_url)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    /// Create a client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        AdminClientBuilder::new().base_url(base_url).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> AdminClientBuilder {
        AdminClientBuilder::new()
    }

    /// Admin endpoint this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Fetch the live configuration.
    ///
    /// A fresh Caddy answers `null`; that is returned as an empty tree.
    pub async fn get_config(&self) -> Result<CaddyConfig> {
        let url = self.url("/config/");
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(&e))?;

        let body = self.handle_text(response).await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(CaddyConfig::default());
        }

        serde_json::from_str(body).map_err(CpmError::Json)
    }

    /// Replace the whole live configuration via `POST /load`
    pub async fn load(&self, config: &CaddyConfig) -> Result<()> {
        let url = self.url("/load");
        debug!(url = %url, routes = config.route_count(), "POST request");

        let response = self
            .inner
            .http
            .post(&url)
            .json(config)
            .send()
            .await
            .map_err(|e| self.send_error(&e))?;

        self.handle_text(response).await.map(|_| ())
    }

    /// Per-upstream counters from the reverse proxy module
    pub async fn upstreams(&self) -> Result<Vec<UpstreamStatus>> {
        self.get("/reverse_proxy/upstreams").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(&e))?;

        let body = self.handle_text(response).await?;
        serde_json::from_str(&body).map_err(CpmError::Json)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn send_error(&self, err: &reqwest::Error) -> CpmError {
        if err.is_timeout() {
            CpmError::Timeout(self.inner.timeout.as_secs())
        } else {
            CpmError::Http(err.to_string())
        }
    }

    /// Read the body of a successful response, or turn a failure into an error
    async fn handle_text(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.send_error(&e))?;

        if status.is_success() {
            return Ok(body);
        }

        // Caddy reports failures as {"error": "..."}
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);

        warn!(status = status.as_u16(), error = %message, "caddy rejected request");
        Err(CpmError::Api {
            code: status.as_u16(),
            message,
        })
    }
}

/// Builder for configuring an [`AdminClient`]
#[derive(Debug, Clone)]
pub struct AdminClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for AdminClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminClientBuilder {
    /// Create a builder pointing at [`DEFAULT_ADMIN_URL`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_ADMIN_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("cpm/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the admin endpoint
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AdminClient> {
        let parsed = Url::parse(&self.base_url)
            .map_err(|e| CpmError::Config(format!("invalid admin URL '{}': {e}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CpmError::Config(format!(
                "admin URL must be http or https: {}",
                self.base_url
            )));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| CpmError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(AdminClient {
            inner: Arc::new(ClientInner {
                http,
                base_url: self.base_url.trim_end_matches('/').to_string(),
                timeout: self.timeout,
            }),
        })
    }
}
