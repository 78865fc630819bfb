use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;

use provider_bridge_adapters::{config, BridgeConfig, RecordingChannelAdapter};
use provider_bridge_core::{BridgeError, HostHandler, InternalId, NativeChannelPort, NativeMessage};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn empty_environment_uses_defaults() {
    let config = BridgeConfig::from_lookup(lookup(&[])).expect("config");
    assert_eq!(config, BridgeConfig::default());
    let settings = config.provider_settings();
    assert_eq!(settings.address, None);
    assert_eq!(settings.chain_id, 1);
    assert_eq!(settings.callback_timeout, None);
    assert_eq!(config.rpc_timeout(), Duration::from_secs(15));
}

#[test]
fn environment_overrides_every_field() {
    let config = BridgeConfig::from_lookup(lookup(&[
        (config::ENV_ADDRESS, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
        (config::ENV_RPC_URL, " https://rpc.example.org "),
        (config::ENV_CHAIN_ID, "0x89"),
        (config::ENV_CALLBACK_TIMEOUT_MS, "2500"),
        (config::ENV_RPC_TIMEOUT_MS, "800"),
        (config::ENV_START_READY, "TRUE"),
    ]))
    .expect("config");

    assert_eq!(config.rpc_url, "https://rpc.example.org");
    assert_eq!(config.chain_id, 137);
    assert!(config.start_ready);
    assert_eq!(config.rpc_timeout(), Duration::from_millis(800));

    let settings = config.provider_settings();
    assert_eq!(
        settings.checksummed_address().as_deref(),
        Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
    );
    assert_eq!(settings.callback_timeout, Some(Duration::from_millis(2500)));
}

#[test]
fn blank_values_are_treated_as_unset() {
    let config = BridgeConfig::from_lookup(lookup(&[
        (config::ENV_ADDRESS, "   "),
        (config::ENV_CHAIN_ID, ""),
    ]))
    .expect("config");
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn invalid_values_name_the_variable() {
    let err = BridgeConfig::from_lookup(lookup(&[(config::ENV_ADDRESS, "0x1234")]))
        .expect_err("short address");
    assert_eq!(err.var, config::ENV_ADDRESS);
    assert!(err.to_string().starts_with("invalid PROVIDER_BRIDGE_ADDRESS"));

    let err = BridgeConfig::from_lookup(lookup(&[(config::ENV_CHAIN_ID, "mainnet")]))
        .expect_err("chain id");
    assert_eq!(err.var, config::ENV_CHAIN_ID);

    let err = BridgeConfig::from_lookup(lookup(&[(config::ENV_CALLBACK_TIMEOUT_MS, "-1")]))
        .expect_err("negative timeout");
    assert_eq!(err.var, config::ENV_CALLBACK_TIMEOUT_MS);

    let err = BridgeConfig::from_lookup(lookup(&[(config::ENV_START_READY, "maybe")]))
        .expect_err("start ready");
    assert!(err.reason.contains("maybe"));
}

#[test]
fn recording_channel_keeps_messages_until_drained() {
    let channel = RecordingChannelAdapter::default();
    for n in 1..=2 {
        channel
            .post_message(NativeMessage {
                name: HostHandler::SignPersonalMessage,
                object: json!({"data": "0x68"}),
                id: InternalId(n),
            })
            .expect("post");
    }
    assert_eq!(channel.sent().expect("sent").len(), 2);

    let drained = channel.drain().expect("drain");
    assert_eq!(drained[0].id, InternalId(1));
    assert_eq!(drained[1].id, InternalId(2));
    assert!(channel.sent().expect("sent").is_empty());
}

#[test]
fn closed_channel_rejects_posts() {
    let channel = RecordingChannelAdapter::default();
    channel.close().expect("close");
    let err = channel
        .post_message(NativeMessage {
            name: HostHandler::SignTransaction,
            object: json!({}),
            id: InternalId(9),
        })
        .expect_err("closed");
    assert_eq!(
        err,
        BridgeError::Transport("native handler signTransaction is gone".to_owned())
    );
    assert!(channel.sent().expect("sent").is_empty());
}
