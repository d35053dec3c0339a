//! JSON-RPC request/response codec.
//!
//! Splits decode failures into parse errors (-32700, not valid JSON) and
//! invalid requests (-32600, valid JSON that does not match the envelope
//! shape). A `jsonrpc` value other than "2.0" is tolerated with a warning;
//! malformed field types are hard failures.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::{JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};
use serde_json::Value;
use tracing::warn;

/// Decode raw bytes into a JSON-RPC request.
pub fn decode_request(raw: &[u8]) -> ProtocolResult<JsonRpcRequest> {
    let value: Value = serde_json::from_slice(raw).map_err(|_| ProtocolError::ParseError)?;
    decode_value(value)
}

/// Decode an already-parsed JSON value into a JSON-RPC request.
pub fn decode_value(value: Value) -> ProtocolResult<JsonRpcRequest> {
    let Value::Object(mut envelope) = value else {
        return Err(ProtocolError::InvalidRequest(
            "request must be a JSON object".into(),
        ));
    };

    let jsonrpc = match envelope.remove("jsonrpc") {
        Some(Value::String(version)) => {
            if version != JSONRPC_VERSION {
                warn!("Unexpected jsonrpc version: {}", version);
            }
            version.into()
        }
        Some(_) => {
            return Err(ProtocolError::InvalidRequest(
                "jsonrpc field must be a string".into(),
            ));
        }
        None => {
            warn!("Missing jsonrpc version field");
            JSONRPC_VERSION.into()
        }
    };

    let method = match envelope.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => {
            return Err(ProtocolError::InvalidRequest(
                "method field must be a string".into(),
            ));
        }
        None => {
            return Err(ProtocolError::InvalidRequest(
                "missing method field".into(),
            ));
        }
    };

    let params = match envelope.remove("params") {
        None | Some(Value::Null) => None,
        Some(params @ Value::Object(_)) => Some(params),
        Some(_) => {
            return Err(ProtocolError::InvalidRequest(
                "params field must be an object".into(),
            ));
        }
    };

    let id = match envelope.remove("id") {
        None => None,
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => Some(RequestId::Number(n)),
            None => {
                return Err(ProtocolError::InvalidRequest(
                    "id field must be a string, integer, or null".into(),
                ));
            }
        },
        Some(Value::Null) => Some(RequestId::Null),
        Some(_) => {
            return Err(ProtocolError::InvalidRequest(
                "id field must be a string, integer, or null".into(),
            ));
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc,
        id,
        method,
        params,
    })
}

/// Encode a JSON-RPC response for the wire.
pub fn encode_response(response: &JsonRpcResponse) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(response)
        .map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}
