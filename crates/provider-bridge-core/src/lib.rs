pub mod callbacks;
pub mod dispatcher;
pub mod domain;
pub mod filter;
pub mod gate;
pub mod ids;
pub mod methods;
pub mod ports;
pub mod state_machine;

pub use callbacks::{CallbackRegistry, Completion, CompletionHandler};
pub use dispatcher::Dispatcher;
pub use domain::{
    HostHandler, InternalId, NativeMessage, Payload, ProviderOutput, ProviderSettings, Request,
    RequestId, ResponseEnvelope, JSONRPC_VERSION, MAX_SAFE_INTEGER,
};
pub use filter::{
    parse_quantity, parse_quantity_str, to_quantity, BlockTag, FilterKind, FilterManager,
    LogCriteria,
};
pub use gate::ReadinessGate;
pub use ids::IdMapping;
pub use methods::{Route, RpcMethod, UnknownMethod};
pub use ports::{BridgeError, ChainRpcPort, NativeChannelPort};
pub use state_machine::{filter_transition, FilterAction, FilterStatus, FilterTransition};
