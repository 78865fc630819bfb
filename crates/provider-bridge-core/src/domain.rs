use std::fmt;
use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest integer a page script can represent exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

pub const JSONRPC_VERSION: &str = "2.0";

/// Bridge-generated correlation id used on the wire to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(pub u64);

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied request id. Any JSON value the page chose to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Value);

impl RequestId {
    /// Returns the id as an integer if it is one the page can round-trip exactly.
    pub fn as_safe_integer(&self) -> Option<u64> {
        self.0.as_u64().filter(|n| *n <= MAX_SAFE_INTEGER)
    }
}

impl From<InternalId> for RequestId {
    fn from(id: InternalId) -> Self {
        Self(Value::from(id.0))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn param(&self, index: usize) -> Value {
        self.params.get(index).cloned().unwrap_or(Value::Null)
    }

    /// The JSON-RPC request object as it goes over the wire to a chain node.
    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": self.id.as_ref().map(|x| x.0.clone()).unwrap_or(Value::Null),
            "method": self.method,
            "params": self.params,
        })
    }
}

/// A page call is either a single request or a batch that fans out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Batch(Vec<Request>),
    Single(Request),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

impl ResponseEnvelope {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result,
        }
    }
}

/// Completed output of an asynchronous page call, mirroring the payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderOutput {
    Batch(Vec<ResponseEnvelope>),
    Single(ResponseEnvelope),
}

/// Host-side message handlers. Closed set registered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostHandler {
    SignTransaction,
    SignMessage,
    SignPersonalMessage,
    SignTypedMessage,
    EcRecover,
    RequestAccounts,
}

impl HostHandler {
    pub fn as_str(self) -> &'static str {
        match self {
            HostHandler::SignTransaction => "signTransaction",
            HostHandler::SignMessage => "signMessage",
            HostHandler::SignPersonalMessage => "signPersonalMessage",
            HostHandler::SignTypedMessage => "signTypedMessage",
            HostHandler::EcRecover => "ecRecover",
            HostHandler::RequestAccounts => "requestAccounts",
        }
    }

    /// Handlers allowed through the readiness gate before the host announces itself.
    pub fn bypasses_gate(self) -> bool {
        matches!(self, HostHandler::RequestAccounts)
    }
}

impl fmt::Display for HostHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape posted to the host: `{ name, object, id }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeMessage {
    pub name: HostHandler,
    pub object: Value,
    pub id: InternalId,
}

/// Immutable per-session identity and behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub address: Option<Address>,
    pub chain_id: u64,
    /// `None` keeps calls pending until the host answers.
    pub callback_timeout: Option<Duration>,
}

impl ProviderSettings {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            chain_id,
            callback_timeout: None,
        }
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    pub fn checksummed_address(&self) -> Option<String> {
        self.address.map(|a| a.to_checksum(None))
    }
}
