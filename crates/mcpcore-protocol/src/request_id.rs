//! JSON-RPC request identifiers.
//!
//! A request ID is either an integer or a string. Equality and serialization
//! must preserve the original wire type; a client that sent `"id": 7` must
//! never see `"id": "7"` come back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-RPC request ID, preserving whether it arrived as a number or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl RequestId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// The `id` field of a response, which may legally be absent (errors detected
/// before the id could be parsed) or explicitly `null`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ResponseId(pub Option<RequestId>);

impl Serialize for ResponseId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match &self.0 {
            Some(id) => id.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ResponseId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self(None));
        }
        let id: RequestId =
            serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        Ok(Self(Some(id)))
    }
}

impl From<RequestId> for ResponseId {
    fn from(value: RequestId) -> Self {
        Self(Some(value))
    }
}

impl From<Option<RequestId>> for ResponseId {
    fn from(value: Option<RequestId>) -> Self {
        Self(value)
    }
}
