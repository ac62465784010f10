//! HTTP fetch abstraction.
//!
//! The pipeline only ever needs "text at URL" and "bytes at URL", so that
//! is the whole trait. Tests swap in an in-memory implementation; the real
//! one wraps a shared `reqwest` client, optionally relaying every request
//! through a proxy endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{HlsGetError, Result};

/// Object-safe fetch interface used by the resolver and segment fetcher.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String>;
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes>;
}

/// Request body understood by the fetch relay.
#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    method: &'static str,
    url: &'a str,
}

/// HTTP fetcher over a shared [`reqwest::Client`].
///
/// Any non-success status is fatal; there are no retries.
pub struct HttpFetcher {
    client: reqwest::Client,
    relay: Option<Url>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            relay: None,
        })
    }

    /// Relay every request through a proxy endpoint that accepts a JSON
    /// body of `{ "method": "GET", "url": "<target>" }` and responds with
    /// the target's body. The rest of the pipeline is oblivious.
    pub fn with_relay(relay: Url) -> Result<Self> {
        let mut fetcher = Self::new()?;
        fetcher.relay = Some(relay);
        Ok(fetcher)
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let response = match &self.relay {
            Some(relay) => {
                self.client
                    .post(relay.clone())
                    .json(&RelayRequest {
                        method: "GET",
                        url: url.as_str(),
                    })
                    .send()
                    .await?
            }
            None => self.client.get(url.clone()).send().await?,
        };
        let status = response.status();
        if !status.is_success() {
            return Err(HlsGetError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "fetching text");
        Ok(self.get(url).await?.text().await?)
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes> {
        debug!(url = %url, "fetching bytes");
        Ok(self.get(url).await?.bytes().await?)
    }
}
