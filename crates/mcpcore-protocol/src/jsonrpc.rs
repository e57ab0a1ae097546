//! JSON-RPC 2.0 message envelope: request, notification, response, and the
//! batch wrapper around any of them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CodecError, JsonRpcError, JsonRpcErrorCode};
use crate::request_id::{RequestId, ResponseId};

/// The literal `"2.0"` version tag, validated on deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version '{s}', expected \"2.0\""
            )))
        }
    }
}

/// A JSON-RPC request: expects a response correlated by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC notification: no `id`, no response expected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response: exactly one of `result` or `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    #[serde(flatten)]
    payload: JsonRpcResponsePayload,
    pub id: ResponseId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Success { result },
            id: id.into(),
        }
    }

    /// A response to a request whose `id` could not be determined, or to a
    /// request that failed before parsing — per JSON-RPC 2.0, `id` is `null`.
    pub fn error_without_id(error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId(None),
        }
    }

    pub fn error_response(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: id.into(),
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::error_without_id(JsonRpcError::new(JsonRpcErrorCode::ParseError, data))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::error_response(id, JsonRpcError::method_not_found(method))
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Error { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            JsonRpcResponsePayload::Success { result } => Some(result),
            JsonRpcResponsePayload::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            JsonRpcResponsePayload::Error { error } => Some(error),
            JsonRpcResponsePayload::Success { .. } => None,
        }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.id.0.as_ref()
    }

    /// Consume the response into the `Result` its payload represents, for
    /// callers (outbound request correlation) that only care about the
    /// raw outcome and not the envelope.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.payload {
            JsonRpcResponsePayload::Success { result } => Ok(result),
            JsonRpcResponsePayload::Error { error } => Err(error),
        }
    }
}

/// A batch of requests, notifications, or responses sent as a single JSON array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonRpcBatch<T> {
    pub items: Vec<T>,
}

impl<T> JsonRpcBatch<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Any one of the five shapes a raw JSON-RPC payload can take on the wire.
///
/// Variant order matters: `serde(untagged)` tries each in turn, and batches
/// must be tried before singular messages only where structurally ambiguous
/// (arrays vs objects are never ambiguous with each other, so order here is
/// for parse-cost, not correctness).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
    RequestBatch(JsonRpcBatch<JsonRpcRequest>),
    ResponseBatch(JsonRpcBatch<JsonRpcResponse>),
}

impl JsonRpcMessage {
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::RequestBatch(_) | Self::ResponseBatch(_))
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            _ => None,
        }
    }
}

/// Inspect presence of `id`/`method`/`result`/`error` without fully
/// unmarshaling, returning what the envelope's shape would decode to.
pub fn parse_message(raw: &[u8]) -> Result<JsonRpcMessage, CodecError> {
    let value: Value = serde_json::from_slice(raw)?;
    parse_value(value)
}

fn parse_value(value: Value) -> Result<JsonRpcMessage, CodecError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(CodecError::InvalidEnvelope {
                    reason: "batch array must not be empty".to_string(),
                });
            }
            let all_requests = items.iter().all(|v| v.get("method").is_some());
            let all_responses = items
                .iter()
                .all(|v| v.get("result").is_some() || v.get("error").is_some());
            if all_requests {
                let reqs: Vec<JsonRpcRequest> = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()?;
                Ok(JsonRpcMessage::RequestBatch(JsonRpcBatch::new(reqs)))
            } else if all_responses {
                let resps: Vec<JsonRpcResponse> = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()?;
                Ok(JsonRpcMessage::ResponseBatch(JsonRpcBatch::new(resps)))
            } else {
                Err(CodecError::InvalidEnvelope {
                    reason: "batch mixes requests and responses".to_string(),
                })
            }
        }
        Value::Object(ref obj) => {
            let has_method = obj.contains_key("method");
            let has_id = obj.contains_key("id");
            let has_result = obj.contains_key("result");
            let has_error = obj.contains_key("error");

            if has_result && has_error {
                return Err(CodecError::InvalidEnvelope {
                    reason: "response must not carry both result and error".to_string(),
                });
            }
            if has_method && (has_result || has_error) {
                return Err(CodecError::InvalidEnvelope {
                    reason: "message must not carry both method and result/error".to_string(),
                });
            }
            if has_method && has_id {
                Ok(JsonRpcMessage::Request(serde_json::from_value(value)?))
            } else if has_method {
                Ok(JsonRpcMessage::Notification(serde_json::from_value(
                    value,
                )?))
            } else if has_result || has_error {
                Ok(JsonRpcMessage::Response(serde_json::from_value(value)?))
            } else {
                Err(CodecError::InvalidEnvelope {
                    reason: "message is none of request, notification, or response".to_string(),
                })
            }
        }
        _ => Err(CodecError::InvalidEnvelope {
            reason: "top-level JSON-RPC value must be an object or array".to_string(),
        }),
    }
}

pub fn serialize_message(message: &JsonRpcMessage) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(message)?)
}
