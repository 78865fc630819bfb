use serde_json::Value;
use thiserror::Error;

use crate::domain::{NativeMessage, Request};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("provider is not ready")]
    NotReady,
    #[error(
        "provider does not support calling {0} synchronously without a callback; call it asynchronously"
    )]
    UnsupportedSyncMethod(String),
    #[error("filter not found: {0}")]
    FilterNotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("{0}")]
    HostSign(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("call {0} timed out waiting for completion")]
    Timeout(u64),
    #[error("completion dropped before resolution")]
    Dropped,
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::NotReady => 4900,
            BridgeError::UnsupportedSyncMethod(_) => -32601,
            BridgeError::FilterNotFound(_) => -32000,
            BridgeError::Rpc { code, .. } => *code,
            BridgeError::HostSign(_) => 4001,
            BridgeError::InvalidParams(_) => -32602,
            BridgeError::Transport(_)
            | BridgeError::Timeout(_)
            | BridgeError::Dropped
            | BridgeError::Internal(_) => -32603,
        }
    }

    pub fn to_error_object(&self) -> Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }

    pub(crate) fn poisoned(what: &str, e: impl std::fmt::Display) -> Self {
        BridgeError::Internal(format!("{what} lock poisoned: {e}"))
    }
}

/// One-way transport to the trusted host. Nothing comes back from `post_message`;
/// the answer arrives later through `Dispatcher::execute_callback`.
pub trait NativeChannelPort {
    fn post_message(&self, message: NativeMessage) -> Result<(), BridgeError>;
}

/// Generic chain JSON-RPC fallback. Resolves to the `result` member of the node's
/// response; node-side error objects surface as `BridgeError::Rpc`.
#[allow(async_fn_in_trait)]
pub trait ChainRpcPort {
    async fn call(&self, request: &Request) -> Result<Value, BridgeError>;
}
