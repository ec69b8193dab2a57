//! HTTP access to the TCGdex catalog API.
//!
//! The catalog cache talks to the network only through [`CatalogBackend`],
//! so tests and alternative transports can be injected. [`ReqwestBackend`]
//! is the production implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, TcgpError};

/// Fetches a JSON document from a catalog URL.
///
/// Implementations map HTTP 404 to [`TcgpError::NotFound`] and every other
/// non-2xx status, transport failure or undecodable body to
/// [`TcgpError::Upstream`].
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// [`CatalogBackend`] over a pooled `reqwest` client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogBackend for ReqwestBackend {
    async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!(url, "catalog request");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TcgpError::upstream(url, e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TcgpError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(TcgpError::upstream(url, format!("HTTP status {}", status.as_u16())));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| TcgpError::upstream(url, format!("malformed JSON: {e}")))
    }
}
