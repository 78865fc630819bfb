//! Catalogue of provider methods the bridge handles itself.
//!
//! Anything that does not parse into [`RpcMethod`] goes to the chain-RPC fallback.

use std::str::FromStr;

use serde_json::Value;

use crate::domain::{HostHandler, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    EthAccounts,
    EthCoinbase,
    NetVersion,
    EthSign,
    PersonalSign,
    PersonalEcRecover,
    EthSignTypedData,
    EthSignTypedDataV3,
    EthSendTransaction,
    EthRequestAccounts,
    EthNewFilter,
    EthNewBlockFilter,
    EthNewPendingTransactionFilter,
    EthUninstallFilter,
    EthGetFilterChanges,
    EthGetFilterLogs,
}

/// Where a method is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answered from session settings without leaving the bridge.
    Local,
    /// Posted to the host under the given handler.
    Native(HostHandler),
    /// Owned by the filter manager.
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl RpcMethod {
    pub const ALL: [RpcMethod; 16] = [
        RpcMethod::EthAccounts,
        RpcMethod::EthCoinbase,
        RpcMethod::NetVersion,
        RpcMethod::EthSign,
        RpcMethod::PersonalSign,
        RpcMethod::PersonalEcRecover,
        RpcMethod::EthSignTypedData,
        RpcMethod::EthSignTypedDataV3,
        RpcMethod::EthSendTransaction,
        RpcMethod::EthRequestAccounts,
        RpcMethod::EthNewFilter,
        RpcMethod::EthNewBlockFilter,
        RpcMethod::EthNewPendingTransactionFilter,
        RpcMethod::EthUninstallFilter,
        RpcMethod::EthGetFilterChanges,
        RpcMethod::EthGetFilterLogs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RpcMethod::EthAccounts => "eth_accounts",
            RpcMethod::EthCoinbase => "eth_coinbase",
            RpcMethod::NetVersion => "net_version",
            RpcMethod::EthSign => "eth_sign",
            RpcMethod::PersonalSign => "personal_sign",
            RpcMethod::PersonalEcRecover => "personal_ecRecover",
            RpcMethod::EthSignTypedData => "eth_signTypedData",
            RpcMethod::EthSignTypedDataV3 => "eth_signTypedData_v3",
            RpcMethod::EthSendTransaction => "eth_sendTransaction",
            RpcMethod::EthRequestAccounts => "eth_requestAccounts",
            RpcMethod::EthNewFilter => "eth_newFilter",
            RpcMethod::EthNewBlockFilter => "eth_newBlockFilter",
            RpcMethod::EthNewPendingTransactionFilter => "eth_newPendingTransactionFilter",
            RpcMethod::EthUninstallFilter => "eth_uninstallFilter",
            RpcMethod::EthGetFilterChanges => "eth_getFilterChanges",
            RpcMethod::EthGetFilterLogs => "eth_getFilterLogs",
        }
    }

    pub fn route(self) -> Route {
        match self {
            RpcMethod::EthAccounts | RpcMethod::EthCoinbase | RpcMethod::NetVersion => Route::Local,
            RpcMethod::EthSign => Route::Native(HostHandler::SignMessage),
            RpcMethod::PersonalSign => Route::Native(HostHandler::SignPersonalMessage),
            RpcMethod::PersonalEcRecover => Route::Native(HostHandler::EcRecover),
            RpcMethod::EthSignTypedData | RpcMethod::EthSignTypedDataV3 => {
                Route::Native(HostHandler::SignTypedMessage)
            }
            RpcMethod::EthSendTransaction => Route::Native(HostHandler::SignTransaction),
            RpcMethod::EthRequestAccounts => Route::Native(HostHandler::RequestAccounts),
            RpcMethod::EthNewFilter
            | RpcMethod::EthNewBlockFilter
            | RpcMethod::EthNewPendingTransactionFilter
            | RpcMethod::EthUninstallFilter
            | RpcMethod::EthGetFilterChanges
            | RpcMethod::EthGetFilterLogs => Route::Filter,
        }
    }

    /// Methods `send` may answer without a callback.
    pub fn allows_sync(self) -> bool {
        matches!(
            self,
            RpcMethod::EthAccounts
                | RpcMethod::EthCoinbase
                | RpcMethod::NetVersion
                | RpcMethod::EthUninstallFilter
        )
    }

    /// The minimal object handed to the host for native methods. Only the
    /// fields the host needs cross the channel.
    pub fn native_object(self, request: &Request) -> Value {
        match self {
            RpcMethod::EthSign => serde_json::json!({ "data": request.param(1) }),
            RpcMethod::PersonalSign => serde_json::json!({ "data": request.param(0) }),
            RpcMethod::PersonalEcRecover => serde_json::json!({
                "signature": request.param(1),
                "message": request.param(0),
            }),
            RpcMethod::EthSignTypedData | RpcMethod::EthSignTypedDataV3 => {
                serde_json::json!({ "data": request.param(1) })
            }
            RpcMethod::EthSendTransaction => request.param(0),
            _ => serde_json::json!({}),
        }
    }
}

impl FromStr for RpcMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMethod(s.to_owned()))
    }
}
