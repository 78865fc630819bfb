use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use provider_bridge_adapters::{BridgeConfig, HttpChainRpcAdapter};
use provider_bridge_core::{Dispatcher, InternalId, Payload, Request};

use crate::output::{LineChannel, LineSink};

type HostDispatcher = Dispatcher<LineChannel, HttpChainRpcAdapter>;

/// One stdin line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HostLine {
    Request(Payload),
    Send(Request),
    Callback(CallbackLine),
    Ready(bool),
}

#[derive(Debug, Deserialize)]
struct CallbackLine {
    id: InternalId,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    value: Value,
}

pub async fn run(config: BridgeConfig) -> eyre::Result<()> {
    let sink = LineSink::stdout();
    let rpc = HttpChainRpcAdapter::from_config(&config)?;
    let dispatcher = Dispatcher::new(
        config.provider_settings(),
        LineChannel::new(sink.clone()),
        rpc,
    );
    if config.start_ready {
        dispatcher.mark_ready();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HostLine>(&line) {
            Ok(command) => handle(&dispatcher, &sink, command)?,
            Err(e) => {
                warn!("unparseable host line: {e}");
                sink.emit(&json!({
                    "error": { "code": -32700, "message": format!("parse error: {e}") },
                    "id": Value::Null,
                }))?;
            }
        }
    }
    info!("stdin closed, shutting down");
    Ok(())
}

fn handle(dispatcher: &HostDispatcher, sink: &LineSink, command: HostLine) -> eyre::Result<()> {
    match command {
        HostLine::Request(payload) => {
            let dispatcher = dispatcher.clone();
            let sink = sink.clone();
            tokio::task::spawn_local(async move {
                let id = match &payload {
                    Payload::Single(request) => request.id.clone().map(|x| x.0),
                    Payload::Batch(_) => None,
                };
                let line = match dispatcher.send_async(payload).await {
                    Ok(output) => json!({ "response": output }),
                    Err(e) => json!({ "error": e.to_error_object(), "id": id }),
                };
                if let Err(e) = sink.emit(&line) {
                    error!("failed to write response: {e}");
                }
            });
        }
        HostLine::Send(request) => {
            let line = match dispatcher.send(&request) {
                Ok(envelope) => json!({ "response": envelope }),
                Err(e) => json!({ "error": e.to_error_object(), "id": request.id }),
            };
            sink.emit(&line)?;
        }
        HostLine::Callback(callback) => {
            if let Err(e) =
                dispatcher.execute_callback(callback.id, callback.error, callback.value)
            {
                error!("callback {} failed: {e}", callback.id);
            }
        }
        HostLine::Ready(ready) => {
            if ready {
                dispatcher.mark_ready();
            }
        }
    }
    Ok(())
}
