#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use serde_json::Value;

use provider_bridge_core::{
    BridgeError, ChainRpcPort, Dispatcher, NativeChannelPort, NativeMessage, ProviderSettings,
    Request, RequestId,
};

#[derive(Debug, Clone, Default)]
pub struct TestChannel {
    sent: Arc<Mutex<Vec<NativeMessage>>>,
}

impl TestChannel {
    pub fn sent(&self) -> Vec<NativeMessage> {
        self.sent.lock().expect("channel lock").clone()
    }
}

impl NativeChannelPort for TestChannel {
    fn post_message(&self, message: NativeMessage) -> Result<(), BridgeError> {
        self.sent.lock().expect("channel lock").push(message);
        Ok(())
    }
}

/// Chain fallback answering from a fixed method -> result table.
#[derive(Debug, Clone, Default)]
pub struct TestChain {
    results: Arc<Mutex<HashMap<String, Value>>>,
    seen: Arc<Mutex<Vec<Request>>>,
    yields: bool,
}

impl TestChain {
    pub fn with_result(self, method: &str, result: Value) -> Self {
        self.results
            .lock()
            .expect("chain lock")
            .insert(method.to_owned(), result);
        self
    }

    /// Suspends once before answering, like a node on the other end of a socket.
    pub fn yielding(mut self) -> Self {
        self.yields = true;
        self
    }

    pub fn seen(&self) -> Vec<Request> {
        self.seen.lock().expect("chain lock").clone()
    }
}

impl ChainRpcPort for TestChain {
    async fn call(&self, request: &Request) -> Result<Value, BridgeError> {
        if self.yields {
            tokio::task::yield_now().await;
        }
        self.seen.lock().expect("chain lock").push(request.clone());
        self.results
            .lock()
            .expect("chain lock")
            .get(&request.method)
            .cloned()
            .ok_or_else(|| BridgeError::Rpc {
                code: -32601,
                message: format!("method {} not found", request.method),
            })
    }
}

pub type TestDispatcher = Dispatcher<TestChannel, TestChain>;

pub fn wallet_address() -> Address {
    "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        .parse()
        .expect("valid wallet address")
}

pub fn new_dispatcher() -> TestDispatcher {
    new_dispatcher_with(ProviderSettings::new(wallet_address(), 1), TestChain::default())
}

pub fn new_dispatcher_with(settings: ProviderSettings, chain: TestChain) -> TestDispatcher {
    Dispatcher::new(settings, TestChannel::default(), chain)
}

pub fn request(id: Value, method: &str, params: Vec<Value>) -> Request {
    Request::new(Some(RequestId(id)), method, params)
}
