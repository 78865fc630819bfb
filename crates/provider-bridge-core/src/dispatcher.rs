use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::callbacks::{CallbackRegistry, Completion};
use crate::domain::{
    HostHandler, InternalId, NativeMessage, Payload, ProviderOutput, ProviderSettings, Request,
    RequestId, ResponseEnvelope,
};
use crate::filter::FilterManager;
use crate::gate::ReadinessGate;
use crate::ids::IdMapping;
use crate::methods::{Route, RpcMethod, UnknownMethod};
use crate::ports::{BridgeError, ChainRpcPort, NativeChannelPort};

/// Provider surface exposed to page script.
///
/// Every table the bridge mutates is owned by one `Dispatcher`, so independent
/// web surfaces each get their own instance. Cloning shares the session.
pub struct Dispatcher<C, R>
where
    C: NativeChannelPort,
    R: ChainRpcPort,
{
    inner: Arc<Session<C, R>>,
}

struct Session<C, R> {
    settings: ProviderSettings,
    channel: C,
    rpc: R,
    ids: IdMapping,
    callbacks: CallbackRegistry,
    gate: ReadinessGate,
    filters: FilterManager,
}

impl<C, R> Clone for Dispatcher<C, R>
where
    C: NativeChannelPort,
    R: ChainRpcPort,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, R> Dispatcher<C, R>
where
    C: NativeChannelPort,
    R: ChainRpcPort,
{
    pub fn new(settings: ProviderSettings, channel: C, rpc: R) -> Self {
        Self {
            inner: Arc::new(Session {
                settings,
                channel,
                rpc,
                ids: IdMapping::default(),
                callbacks: CallbackRegistry::default(),
                gate: ReadinessGate::default(),
                filters: FilterManager::default(),
            }),
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.inner.settings
    }

    pub fn channel(&self) -> &C {
        &self.inner.channel
    }

    pub fn rpc(&self) -> &R {
        &self.inner.rpc
    }

    pub fn filters(&self) -> &FilterManager {
        &self.inner.filters
    }

    /// Host signer finished initialising.
    pub fn mark_ready(&self) {
        self.inner.gate.mark_ready();
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    pub fn eth_accounts(&self) -> Vec<String> {
        self.inner.settings.checksummed_address().into_iter().collect()
    }

    pub fn eth_coinbase(&self) -> Option<String> {
        self.inner.settings.checksummed_address()
    }

    pub fn net_version(&self) -> String {
        self.inner.settings.chain_id.to_string()
    }

    /// Exposes the configured account. Never reaches the host.
    pub fn enable(&self) -> Vec<String> {
        self.eth_accounts()
    }

    /// Calls still waiting for a completion.
    pub fn pending_calls(&self) -> Result<usize, BridgeError> {
        self.inner.callbacks.len()
    }

    /// Rewritten ids still waiting for a response.
    pub fn mapped_ids(&self) -> Result<usize, BridgeError> {
        self.inner.ids.len()
    }

    /// Synchronous path. Only the fixed allow-list can be answered without a callback.
    pub fn send(&self, request: &Request) -> Result<ResponseEnvelope, BridgeError> {
        let method = request
            .method
            .parse::<RpcMethod>()
            .ok()
            .filter(|m| m.allows_sync())
            .ok_or_else(|| BridgeError::UnsupportedSyncMethod(request.method.clone()))?;
        let id = request.id.clone().unwrap_or(RequestId(Value::Null));
        let result = match method {
            RpcMethod::EthUninstallFilter => {
                Value::Bool(self.inner.filters.uninstall_filter(&request.param(0))?)
            }
            other => self.local_result(other),
        };
        Ok(ResponseEnvelope::new(id, result))
    }

    /// Asynchronous path. A batch runs every call concurrently and yields the
    /// results in request order, or the first error in request order.
    ///
    /// Every call in a batch runs to completion even after another one failed,
    /// so each releases its own id mapping and callback slot.
    pub async fn send_async(&self, payload: Payload) -> Result<ProviderOutput, BridgeError> {
        match payload {
            Payload::Single(request) => self.dispatch(request).await.map(ProviderOutput::Single),
            Payload::Batch(requests) => {
                join_all(requests.into_iter().map(|request| self.dispatch(request)))
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()
                    .map(ProviderOutput::Batch)
            }
        }
    }

    /// Callback flavour of [`Dispatcher::send_async`]; the callback fires exactly once.
    pub async fn send_async_with<F>(&self, payload: Payload, callback: F)
    where
        F: FnOnce(Result<ProviderOutput, BridgeError>),
    {
        callback(self.send_async(payload).await)
    }

    /// Routes a single request and waits for its completion.
    pub async fn dispatch(&self, mut request: Request) -> Completion {
        let id = self.inner.ids.try_intify_id(&mut request)?;
        let (tx, rx) = oneshot::channel();
        self.inner.callbacks.register(
            id,
            Box::new(move |completion| {
                let _ = tx.send(completion);
            }),
        )?;

        let method = match request.method.parse::<RpcMethod>() {
            Ok(method) => method,
            Err(UnknownMethod(name)) => {
                self.inner.callbacks.remove(id)?;
                trace!(target: "bridge::dispatch", "{} -> fallback ({})", id, name);
                return self.forward(id, &request).await;
            }
        };

        trace!(target: "bridge::dispatch", "{} -> {}", id, method.name());
        match method.route() {
            Route::Local => self.send_response(id, self.local_result(method))?,
            Route::Native(handler) => {
                self.post_message(handler, id, method.native_object(&request))?
            }
            Route::Filter => match self.run_filter(method, &request).await {
                Ok(result) => self.send_response(id, result)?,
                Err(e) => self.send_error(id, e)?,
            },
        }

        self.await_completion(id, rx).await
    }

    /// The single inbound entry point from the host.
    pub fn execute_callback(
        &self,
        id: InternalId,
        error: Option<Value>,
        value: Value,
    ) -> Result<(), BridgeError> {
        match error.filter(|e| !e.is_null()) {
            Some(error) => self.send_error(id, BridgeError::HostSign(host_error_message(&error))),
            None => self.send_response(id, value),
        }
    }

    /// Posts to the host if the gate admits `handler`, otherwise fails the call
    /// with `NotReady` without touching the channel.
    pub fn post_message(
        &self,
        handler: HostHandler,
        id: InternalId,
        object: Value,
    ) -> Result<(), BridgeError> {
        if !self.inner.gate.admits(handler) {
            return self.send_error(id, BridgeError::NotReady);
        }
        let message = NativeMessage {
            name: handler,
            object,
            id,
        };
        if let Err(e) = self.inner.channel.post_message(message) {
            return self.send_error(id, e);
        }
        Ok(())
    }

    pub fn send_response(&self, id: InternalId, result: Value) -> Result<(), BridgeError> {
        if !self.inner.callbacks.contains(id)? {
            warn!(target: "bridge::dispatch", "no pending call for response {}", id);
            return Ok(());
        }
        let original = self.inner.ids.try_pop_id(id)?;
        let envelope = ResponseEnvelope::new(original, unwrap_response(result));
        self.inner.callbacks.resolve(id, Ok(envelope))?;
        Ok(())
    }

    pub fn send_error(&self, id: InternalId, error: BridgeError) -> Result<(), BridgeError> {
        debug!(target: "bridge::dispatch", "<== {} sendError {}", id, error);
        if !self.inner.callbacks.contains(id)? {
            warn!(target: "bridge::dispatch", "no pending call for error {}", id);
            return Ok(());
        }
        self.inner.ids.try_pop_id(id)?;
        self.inner.callbacks.resolve(id, Err(error))?;
        Ok(())
    }

    fn local_result(&self, method: RpcMethod) -> Value {
        match method {
            RpcMethod::EthAccounts => Value::from(self.eth_accounts()),
            RpcMethod::EthCoinbase => self.eth_coinbase().map(Value::from).unwrap_or(Value::Null),
            RpcMethod::NetVersion => Value::from(self.net_version()),
            other => {
                warn!(target: "bridge::dispatch", "{} has no local result", other.name());
                Value::Null
            }
        }
    }

    async fn run_filter(&self, method: RpcMethod, request: &Request) -> Result<Value, BridgeError> {
        let filters = &self.inner.filters;
        let rpc = &self.inner.rpc;
        match method {
            RpcMethod::EthNewFilter => filters.new_filter(rpc, &request.params).await,
            RpcMethod::EthNewBlockFilter => filters.new_block_filter(rpc).await,
            RpcMethod::EthNewPendingTransactionFilter => {
                filters.new_pending_transaction_filter(rpc).await
            }
            RpcMethod::EthUninstallFilter => filters
                .uninstall_filter(&request.param(0))
                .map(Value::Bool),
            RpcMethod::EthGetFilterChanges => {
                filters.get_filter_changes(rpc, &request.param(0)).await
            }
            RpcMethod::EthGetFilterLogs => filters.get_filter_logs(rpc, &request.param(0)).await,
            other => Err(BridgeError::Internal(format!(
                "{} is not a filter method",
                other.name()
            ))),
        }
    }

    /// Hands an unrecognised request to the chain-RPC fallback. The node's
    /// answer skips the callback registry but still carries the caller's id.
    async fn forward(&self, id: InternalId, request: &Request) -> Completion {
        let outcome = self.inner.rpc.call(request).await;
        let original = self.inner.ids.try_pop_id(id)?;
        outcome.map(|result| ResponseEnvelope::new(original, result))
    }

    async fn await_completion(
        &self,
        id: InternalId,
        rx: oneshot::Receiver<Completion>,
    ) -> Completion {
        let received = match self.inner.settings.callback_timeout {
            None => rx.await,
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(target: "bridge::dispatch", "call {} timed out after {:?}", id, limit);
                    self.inner.callbacks.remove(id)?;
                    self.inner.ids.try_pop_id(id)?;
                    return Err(BridgeError::Timeout(id.0));
                }
            },
        };
        received.map_err(|_| BridgeError::Dropped)?
    }
}

/// A result that is itself a JSON-RPC response is unwrapped rather than nested.
fn unwrap_response(result: Value) -> Value {
    let nested = result.is_object()
        && result.get("jsonrpc").is_some_and(is_truthy)
        && result.get("result").is_some_and(is_truthy);
    match result {
        Value::Object(mut obj) if nested => obj.remove("result").unwrap_or(Value::Null),
        other => other,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn host_error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
