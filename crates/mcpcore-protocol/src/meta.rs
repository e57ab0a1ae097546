//! The `_meta` side-channel carried on request params.
//!
//! `_meta` is opaque to the core: everything in it (besides `progressToken`)
//! travels end-to-end untouched, and none of it is ever forwarded into a
//! tool's `arguments` map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key under which `_meta` lives inside a request's `params` object.
pub const META_KEY: &str = "_meta";

/// Reserved `_meta` field carrying a progress-notification correlation token.
pub const PROGRESS_TOKEN_KEY: &str = "progressToken";

/// The `_meta` object attached to a request's params, if any.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta(pub serde_json::Map<String, Value>);

impl Meta {
    pub fn progress_token(&self) -> Option<&Value> {
        self.0.get(PROGRESS_TOKEN_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a `params` object into its `_meta` (if present) and the remaining
/// fields, which is what gets handed to a tool as `arguments`.
///
/// `_meta` is always removed from the returned params, regardless of whether
/// the call site cares about it, so callers can never accidentally leak it
/// into argument maps.
pub fn split_meta(params: Option<Value>) -> (Option<Value>, Option<Meta>) {
    let Some(Value::Object(mut map)) = params else {
        return (params, None);
    };
    let meta = map
        .remove(META_KEY)
        .and_then(|v| v.as_object().cloned())
        .map(Meta);
    (Some(Value::Object(map)), meta)
}
