use serde_json::json;

use provider_bridge_core::{
    BridgeError, HostHandler, InternalId, NativeMessage, Payload, ProviderOutput, Request,
    RequestId, ResponseEnvelope,
};

#[test]
fn request_without_params_or_id_deserializes() {
    let req: Request = serde_json::from_value(json!({"method": "eth_accounts"})).expect("request");
    assert_eq!(req.id, None);
    assert!(req.params.is_empty());
}

#[test]
fn payload_distinguishes_single_and_batch() {
    let single: Payload =
        serde_json::from_value(json!({"id": "x", "method": "net_version"})).expect("single");
    assert!(matches!(single, Payload::Single(ref r) if r.id == Some(RequestId(json!("x")))));

    let batch: Payload = serde_json::from_value(json!([
        {"id": 1, "method": "eth_accounts"},
        {"id": 2, "method": "eth_coinbase"}
    ]))
    .expect("batch");
    assert!(matches!(batch, Payload::Batch(ref r) if r.len() == 2));
}

#[test]
fn native_message_wire_shape() {
    let message = NativeMessage {
        name: HostHandler::SignPersonalMessage,
        object: json!({"data": "0x68656c6c6f"}),
        id: InternalId(12),
    };
    assert_eq!(
        serde_json::to_value(&message).expect("serialize"),
        json!({"name": "signPersonalMessage", "object": {"data": "0x68656c6c6f"}, "id": 12})
    );
    assert_eq!(HostHandler::EcRecover.to_string(), "ecRecover");
}

#[test]
fn envelope_and_batch_output_wire_shape() {
    let envelope = ResponseEnvelope::new(RequestId(json!("abc")), json!(["0x1"]));
    assert_eq!(
        serde_json::to_value(&envelope).expect("serialize"),
        json!({"jsonrpc": "2.0", "id": "abc", "result": ["0x1"]})
    );

    let output = ProviderOutput::Batch(vec![envelope.clone(), envelope]);
    let value = serde_json::to_value(&output).expect("serialize batch");
    assert_eq!(value.as_array().map(Vec::len), Some(2));
}

#[test]
fn error_objects_carry_codes() {
    assert_eq!(
        BridgeError::NotReady.to_error_object(),
        json!({"code": 4900, "message": "provider is not ready"})
    );
    assert_eq!(BridgeError::HostSign("User denied".to_owned()).code(), 4001);
    assert_eq!(
        BridgeError::Rpc {
            code: -32005,
            message: "limit exceeded".to_owned()
        }
        .code(),
        -32005
    );
    assert_eq!(BridgeError::FilterNotFound("0x9".to_owned()).code(), -32000);
}
