//! Backends talking to an IPFS-compatible HTTP API.

mod block;
mod pin;

pub use block::{ApiCollector, ApiDrain};
pub use pin::ApiPinEnumerator;

use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{BackendError, Result};

const USER_AGENT: &str = concat!("pump/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Error body returned by the API on failed commands.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Client for the `/api/v0` command endpoints of one node.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Create a client for the node at `base_url`, e.g. `http://127.0.0.1:5001`.
    pub fn new(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| BackendError::InvalidUrl {
            input: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl {
                input: base_url.to_string(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        install_rustls_provider();
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.base, command)
    }

    /// Start a POST request for `command`, e.g. `block/get`.
    pub(crate) fn command(&self, command: &str) -> reqwest::RequestBuilder {
        self.client.post(self.endpoint(command))
    }
}

/// Turn a non-success response into [`BackendError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ApiMessage>(&body) {
        Ok(api) => api.message,
        Err(_) => body.trim().to_string(),
    };
    Err(BackendError::Status { status, body })
}
