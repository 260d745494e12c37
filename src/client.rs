//! Typed HTTP client for a cache node.
//!
//! Talks to any node in the cluster; the contacted node forwards operations
//! it does not own. Used by external consumers and by the integration suite.

use crate::api::protocol::{GetResponse, SetRequest, ENDPOINT_DELETE, ENDPOINT_GET, ENDPOINT_SET};
use crate::membership::protocol::{NodeInfo, RegisterRequest, ENDPOINT_LIST, ENDPOINT_REGISTER};

use anyhow::{bail, Result};
use serde_json::Value;

pub struct CacheClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl CacheClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Reads a key. `Ok(None)` means the key is absent or expired.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let resp = self
            .http_client
            .get(format!("{}{}", self.base_url, ENDPOINT_GET))
            .query(&[("key", key)])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("get {key:?} answered {}", resp.status());
        }

        let body: GetResponse = resp.json().await?;
        Ok(Some(body.value))
    }

    /// Writes a key. `ttl_secs == 0` stores an entry without expiry.
    pub async fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<()> {
        let body = SetRequest {
            key: key.to_string(),
            value,
            ttl: ttl_secs,
        };
        let resp = self
            .http_client
            .post(format!("{}{}", self.base_url, ENDPOINT_SET))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("set {key:?} answered {}", resp.status());
        }
        Ok(())
    }

    /// Deletes a key; succeeds whether or not it existed.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let resp = self
            .http_client
            .delete(format!("{}{}", self.base_url, ENDPOINT_DELETE))
            .query(&[("key", key)])
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("delete {key:?} answered {}", resp.status());
        }
        Ok(())
    }

    /// The contacted node's view of the cluster.
    pub async fn nodes(&self) -> Result<Vec<NodeInfo>> {
        let resp = self
            .http_client
            .get(format!("{}{}", self.base_url, ENDPOINT_LIST))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("node list answered {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    /// Registers a node with the contacted peer.
    pub async fn register(&self, id: &str, address: &str) -> Result<()> {
        let body = RegisterRequest {
            id: id.to_string(),
            address: address.to_string(),
        };
        let resp = self
            .http_client
            .post(format!("{}{}", self.base_url, ENDPOINT_REGISTER))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("register answered {}", resp.status());
        }
        Ok(())
    }
}
