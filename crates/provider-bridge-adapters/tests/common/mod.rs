#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256};
use serde_json::Value;

use provider_bridge_adapters::{ChainLog, InMemoryChainAdapter, RecordingChannelAdapter};
use provider_bridge_core::{Dispatcher, ProviderSettings, Request, RequestId, ResponseEnvelope};

pub type ChainDispatcher = Dispatcher<RecordingChannelAdapter, InMemoryChainAdapter>;

pub fn token_address() -> Address {
    "0x000000000000000000000000000000000000cafe"
        .parse()
        .expect("token address")
}

pub fn other_address() -> Address {
    "0x000000000000000000000000000000000000beef"
        .parse()
        .expect("other address")
}

/// keccak256("Transfer(address,address,uint256)")
pub fn transfer_topic() -> B256 {
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        .parse()
        .expect("transfer topic")
}

pub fn approval_topic() -> B256 {
    "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        .parse()
        .expect("approval topic")
}

pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn transfer_log(address: Address) -> ChainLog {
    ChainLog {
        address,
        topics: vec![transfer_topic()],
        data: Bytes::from_static(&[0x01]),
    }
}

pub fn new_chain_dispatcher() -> ChainDispatcher {
    let address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        .parse()
        .expect("wallet address");
    Dispatcher::new(
        ProviderSettings::new(address, 1),
        RecordingChannelAdapter::default(),
        InMemoryChainAdapter::default(),
    )
}

pub async fn call(dispatcher: &ChainDispatcher, id: u64, method: &str, params: Vec<Value>) -> Value {
    let envelope: ResponseEnvelope = dispatcher
        .dispatch(Request::new(Some(RequestId(Value::from(id))), method, params))
        .await
        .unwrap_or_else(|e| panic!("{method} failed: {e}"));
    envelope.result
}
