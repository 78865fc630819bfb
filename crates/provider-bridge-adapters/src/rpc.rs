use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use provider_bridge_core::{BridgeError, ChainRpcPort, Request};

use crate::BridgeConfig;

/// JSON-RPC over HTTP to the chain node configured for the session.
#[derive(Debug, Clone)]
pub struct HttpChainRpcAdapter {
    url: String,
    client: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl HttpChainRpcAdapter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Transport(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Self::new(config.rpc_url.clone(), config.rpc_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChainRpcPort for HttpChainRpcAdapter {
    async fn call(&self, request: &Request) -> Result<Value, BridgeError> {
        let mut payload = request.to_wire();
        if payload.get("id").map_or(true, Value::is_null) {
            payload["id"] = Value::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        }
        trace!(target: "bridge::rpc", "==> {} {}", request.method, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(format!("rpc request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::Transport(format!("rpc json decode failed: {e}")))?;

        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(BridgeError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(-32603),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| err.to_string()),
            });
        }
        if !status.is_success() {
            return Err(BridgeError::Transport(format!(
                "rpc status {}: {}",
                status, body
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| BridgeError::Transport("rpc response missing result".to_owned()))
    }
}
