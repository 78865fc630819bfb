pub mod channel;
pub mod config;
pub mod memory;
pub mod rpc;

pub use channel::RecordingChannelAdapter;
pub use config::{BridgeConfig, ConfigError};
pub use memory::{ChainLog, InMemoryChainAdapter};
pub use rpc::HttpChainRpcAdapter;
