use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tiny_http::{Method, Response, Server, StatusCode};

use provider_bridge_adapters::{BridgeConfig, HttpChainRpcAdapter};
use provider_bridge_core::{BridgeError, ChainRpcPort, Request, RequestId};

/// Answers up to `requests` JSON-RPC posts, recording each body.
fn spawn_mock_node(
    requests: usize,
    bodies: Arc<Mutex<Vec<Value>>>,
) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..requests {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
            if let Ok(mut g) = bodies.lock() {
                g.push(body.clone());
            }

            let id = body.get("id").cloned().unwrap_or(Value::Null);
            let method = body.get("method").and_then(Value::as_str).unwrap_or_default();
            let verb = req.method().clone();
            let (code, payload) = match (verb, method) {
                (Method::Post, "eth_blockNumber") => {
                    (200, json!({"jsonrpc": "2.0", "id": id, "result": "0x1b4"}))
                }
                (Method::Post, "eth_call") => (
                    200,
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": 3, "message": "execution reverted"}}),
                ),
                (Method::Post, "eth_chainId") => (200, json!({"jsonrpc": "2.0", "id": id})),
                (Method::Post, _) => (503, json!({"message": "node syncing"})),
                _ => (405, json!({"error": "method not allowed"})),
            };

            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    (addr, join)
}

fn adapter(url: &str) -> HttpChainRpcAdapter {
    HttpChainRpcAdapter::new(url, Duration::from_secs(5)).expect("rpc adapter")
}

#[tokio::test]
async fn http_adapter_round_trips_results_and_errors() {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let (url, join) = spawn_mock_node(4, Arc::clone(&bodies));
    let rpc = adapter(&url);
    assert_eq!(rpc.url(), url);

    let head = rpc
        .call(&Request::new(Some(RequestId(json!(41))), "eth_blockNumber", Vec::new()))
        .await
        .expect("block number");
    assert_eq!(head, json!("0x1b4"));

    let err = rpc
        .call(&Request::new(None, "eth_call", vec![json!({}), json!("latest")]))
        .await
        .expect_err("reverted");
    assert_eq!(
        err,
        BridgeError::Rpc {
            code: 3,
            message: "execution reverted".to_owned()
        }
    );

    let err = rpc
        .call(&Request::new(None, "eth_chainId", Vec::new()))
        .await
        .expect_err("missing result");
    assert!(matches!(err, BridgeError::Transport(ref m) if m.contains("missing result")));

    let err = rpc
        .call(&Request::new(None, "eth_gasPrice", Vec::new()))
        .await
        .expect_err("unavailable");
    assert!(matches!(err, BridgeError::Transport(ref m) if m.contains("503")));
    assert_eq!(err.code(), -32603);

    join.join().expect("server thread");
    let bodies = bodies.lock().expect("bodies").clone();
    assert_eq!(bodies.len(), 4);
    assert_eq!(bodies[0]["jsonrpc"], json!("2.0"));
    assert_eq!(bodies[0]["id"], json!(41));
    assert_eq!(bodies[0]["method"], json!("eth_blockNumber"));
    assert_eq!(bodies[1]["params"], json!([{}, "latest"]));
    // Requests without an id get a fresh one from the adapter.
    assert!(bodies[1]["id"].is_u64());
    assert_ne!(bodies[1]["id"], bodies[2]["id"]);
}

#[tokio::test]
async fn unreachable_node_is_a_transport_error() {
    let rpc = adapter("http://127.0.0.1:9");
    let err = rpc
        .call(&Request::new(None, "eth_blockNumber", Vec::new()))
        .await
        .expect_err("nothing listens on the discard port");
    assert!(matches!(err, BridgeError::Transport(_)));
}

#[test]
fn adapter_builds_from_config() {
    let config = BridgeConfig {
        rpc_url: "http://localhost:8545".to_owned(),
        ..BridgeConfig::default()
    };
    let rpc = HttpChainRpcAdapter::from_config(&config).expect("adapter");
    assert_eq!(rpc.url(), "http://localhost:8545");
}
