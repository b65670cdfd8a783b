use crate::domain::ports::{Endpoint, GatewayTransport, TransportReply};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Posts gateway requests over HTTPS with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpGatewayTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGatewayTransport {
    /// # Arguments
    ///
    /// * `base_url` - Gateway API root; endpoint names are appended to it.
    /// * `timeout` - Upper bound on each request, connect included.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::GatewayUnavailable {
                endpoint: "client".to_string(),
                reason: e.to_string(),
                timed_out: false,
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    async fn post(&self, endpoint: Endpoint, body: &serde_json::Value) -> Result<TransportReply> {
        let unavailable = |e: reqwest::Error| GatewayError::GatewayUnavailable {
            endpoint: endpoint.to_string(),
            reason: if e.is_timeout() {
                format!("no reply within {}ms", self.timeout.as_millis())
            } else {
                e.to_string()
            },
            timed_out: e.is_timeout(),
        };

        let response = self
            .client
            .post(self.url_for(endpoint))
            .json(body)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::warn!(%endpoint, status, "gateway returned non-success status");
        }
        let body = response.bytes().await.map_err(unavailable)?;

        Ok(TransportReply {
            status,
            body: body.to_vec(),
        })
    }
}
