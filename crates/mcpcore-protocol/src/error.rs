//! JSON-RPC error codes and the protocol-layer error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard JSON-RPC 2.0 error codes, plus the application-defined range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ApplicationError(i32),
}

impl JsonRpcErrorCode {
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ApplicationError(code) => code,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ApplicationError(_) => "Application error",
        }
    }
}

impl From<i32> for JsonRpcErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            other => Self::ApplicationError(other),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// A JSON-RPC error object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data,
        }
    }

    pub fn parse_error(data: impl Into<Option<Value>>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, data.into())
    }

    pub fn invalid_request(data: impl Into<Option<Value>>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, data.into())
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(Value::String(format!("method '{method}' not found"))),
        )
    }

    pub fn invalid_params(data: impl Into<Option<Value>>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, data.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: JsonRpcErrorCode::InternalError.code(),
            message: JsonRpcErrorCode::InternalError.message().to_string(),
            data: Some(Value::String(message)),
        }
    }
}

impl From<JsonRpcErrorCode> for JsonRpcError {
    fn from(code: JsonRpcErrorCode) -> Self {
        Self::new(code, None)
    }
}

/// Errors produced while parsing or framing raw bytes into JSON-RPC messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("not a legal JSON-RPC envelope: {reason}")]
    InvalidEnvelope { reason: String },
}

impl CodecError {
    pub fn as_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::MalformedJson(e) => JsonRpcError::parse_error(Some(Value::String(e.to_string()))),
            Self::InvalidEnvelope { reason } => {
                JsonRpcError::invalid_request(Some(Value::String(reason.clone())))
            }
        }
    }
}
