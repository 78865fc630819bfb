use std::time::Duration;

use alloy::primitives::Address;
use provider_bridge_core::{parse_quantity_str, ProviderSettings};
use thiserror::Error;

pub const ENV_ADDRESS: &str = "PROVIDER_BRIDGE_ADDRESS";
pub const ENV_RPC_URL: &str = "PROVIDER_BRIDGE_RPC_URL";
pub const ENV_CHAIN_ID: &str = "PROVIDER_BRIDGE_CHAIN_ID";
pub const ENV_CALLBACK_TIMEOUT_MS: &str = "PROVIDER_BRIDGE_CALLBACK_TIMEOUT_MS";
pub const ENV_RPC_TIMEOUT_MS: &str = "PROVIDER_BRIDGE_RPC_TIMEOUT_MS";
pub const ENV_START_READY: &str = "PROVIDER_BRIDGE_START_READY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub address: Option<Address>,
    pub rpc_url: String,
    pub chain_id: u64,
    /// `None` means a call waits for its host answer forever.
    pub callback_timeout_ms: Option<u64>,
    pub rpc_timeout_ms: u64,
    pub start_ready: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: None,
            rpc_url: "http://127.0.0.1:8545".to_owned(),
            chain_id: 1,
            callback_timeout_ms: None,
            rpc_timeout_ms: 15_000,
            start_ready: false,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = get(ENV_ADDRESS) {
            let address = raw.parse::<Address>().map_err(|e| ConfigError {
                var: ENV_ADDRESS,
                reason: e.to_string(),
            })?;
            config.address = Some(address);
        }
        if let Some(url) = get(ENV_RPC_URL) {
            config.rpc_url = url;
        }
        if let Some(raw) = get(ENV_CHAIN_ID) {
            config.chain_id = parse_quantity_str(&raw).map_err(|e| ConfigError {
                var: ENV_CHAIN_ID,
                reason: e.to_string(),
            })?;
        }
        if let Some(raw) = get(ENV_CALLBACK_TIMEOUT_MS) {
            config.callback_timeout_ms = Some(parse_millis(ENV_CALLBACK_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_RPC_TIMEOUT_MS) {
            config.rpc_timeout_ms = parse_millis(ENV_RPC_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_START_READY) {
            config.start_ready = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError {
                        var: ENV_START_READY,
                        reason: format!("expected a boolean, got {other}"),
                    })
                }
            };
        }
        Ok(config)
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            address: self.address,
            chain_id: self.chain_id,
            callback_timeout: self.callback_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

fn parse_millis(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|e| ConfigError {
        var,
        reason: format!("{e}"),
    })
}
