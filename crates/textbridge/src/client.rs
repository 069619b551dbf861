use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{BOOTSTRAP_PATH, BootstrapRequest, SECRET_HEADER, WEBHOOK_PATH, WebhookRequest};
use anyhow::Context;
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// HTTP client for a single bridge.
///
/// Performs the raw exchanges only; callers interpret status codes. Every
/// request carries the configured timeout so a hung bridge surfaces as
/// [`BridgeError::Network`] instead of blocking forever.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
}

/// Status and body text of a completed exchange.
#[derive(Debug, Clone)]
pub struct BridgeReply {
    pub status: StatusCode,
    pub body: String,
}

impl BridgeClient {
    pub fn new(base_url: &str, timeout: Duration) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("textbridge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from resolved configuration. Fails when no bridge URL is set.
    pub fn from_config(config: &BridgeConfig) -> BridgeResult<Self> {
        let Some(url) = config.bridge_url.as_deref() else {
            return Err(BridgeError::ConfigurationMissing);
        };
        Self::new(url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST {base}/bootstrap`.
    pub async fn bootstrap(&self, passphrase: &str) -> BridgeResult<BridgeReply> {
        let resp = self
            .http
            .post(self.url(BOOTSTRAP_PATH))
            .json(&BootstrapRequest {
                passphrase: passphrase.to_string(),
            })
            .send()
            .await?;
        Self::reply(resp).await
    }

    /// `POST {base}/webhook` with the session secret header.
    pub async fn webhook(&self, secret: &str, request: &WebhookRequest) -> BridgeResult<BridgeReply> {
        let resp = self
            .http
            .post(self.url(WEBHOOK_PATH))
            .header(SECRET_HEADER, secret)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if matches!(status.as_u16(), 401 | 403) {
            // The status alone settles a rejected secret; the body is not read.
            return Ok(BridgeReply {
                status,
                body: String::new(),
            });
        }
        Self::reply(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn reply(resp: Response) -> BridgeResult<BridgeReply> {
        let status = resp.status();
        let body = resp.text().await?;
        Ok(BridgeReply { status, body })
    }
}
