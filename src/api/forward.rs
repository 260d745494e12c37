use super::handlers::json_error;
use super::protocol::{SetRequest, FORWARDED_HEADER};
use crate::membership::types::Node;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const FORWARD_TIMEOUT: Duration = Duration::from_secs(1);
const FORWARD_ATTEMPTS: usize = 3;

/// Relays a client operation to the node that owns its key and hands the
/// owner's answer back unchanged (status code and body).
pub struct Forwarder {
    http_client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            http_client: reqwest::Client::new(),
        })
    }

    pub async fn forward_get(&self, owner: &Node, path: &str, key: &str) -> Response {
        let request = self
            .http_client
            .get(format!("{}{}", owner.address, path))
            .query(&[("key", key)]);
        self.relay(request, owner).await
    }

    pub async fn forward_set(&self, owner: &Node, path: &str, body: &SetRequest) -> Response {
        let request = self
            .http_client
            .post(format!("{}{}", owner.address, path))
            .json(body);
        self.relay(request, owner).await
    }

    pub async fn forward_delete(&self, owner: &Node, path: &str, key: &str) -> Response {
        let request = self
            .http_client
            .delete(format!("{}{}", owner.address, path))
            .query(&[("key", key)]);
        self.relay(request, owner).await
    }

    // Bounded retries with backoff and jitter; when every attempt fails the
    // caller gets a 502 rather than a locally served answer.
    async fn relay(&self, request: reqwest::RequestBuilder, owner: &Node) -> Response {
        let request = request
            .header(FORWARDED_HEADER, "1")
            .timeout(FORWARD_TIMEOUT);

        let mut delay_ms = 150u64;
        for attempt in 1..=FORWARD_ATTEMPTS {
            let Some(attempt_request) = request.try_clone() else {
                break;
            };
            match attempt_request.send().await {
                Ok(resp) => {
                    let status = StatusCode::from_u16(resp.status().as_u16())
                        .unwrap_or(StatusCode::BAD_GATEWAY);
                    let content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("application/json")
                        .to_string();
                    match resp.bytes().await {
                        Ok(body) => {
                            return (status, [(header::CONTENT_TYPE, content_type)], body)
                                .into_response();
                        }
                        Err(e) => {
                            warn!("forward to node {} lost the response body: {e}", owner.id)
                        }
                    }
                }
                Err(e) => warn!(
                    "forward attempt {attempt} to node {} at {} failed: {e}",
                    owner.id, owner.address
                ),
            }

            if attempt < FORWARD_ATTEMPTS {
                let jitter = rand::random::<u64>() % 50;
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = (delay_ms * 2).min(1_200);
            }
        }

        json_error(
            StatusCode::BAD_GATEWAY,
            &format!("owner node {} is unreachable", owner.id),
        )
    }
}
