//! `completion/complete` dispatch on `ref.type` (§4.7).

use serde::{Deserialize, Serialize};

use crate::capabilities::prompt::PromptRegistry;
use crate::capabilities::resource::ResourceRegistry;
use crate::error::ServerResult;

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum CompletionReference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    Resource { uri: String },
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompletionArgument {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompletionResult {
    pub values: Vec<String>,
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl CompletionResult {
    pub fn empty() -> Self {
        Self {
            values: Vec::new(),
            has_more: None,
        }
    }
}

/// Resolve a `completion/complete` call by delegating to the prompt or
/// resource-template registry named by `reference`. A reference with no
/// completion handler registered yields an empty result, not an error.
pub async fn complete(
    prompts: &PromptRegistry,
    resources: &ResourceRegistry,
    reference: CompletionReference,
    argument: CompletionArgument,
) -> ServerResult<CompletionResult> {
    match reference {
        CompletionReference::Prompt { name } => {
            let Some(handler) = prompts.find(&name) else {
                return Ok(CompletionResult::empty());
            };
            let values = handler.complete(&argument.name, &argument.value).await;
            Ok(CompletionResult { values, has_more: None })
        }
        CompletionReference::Resource { uri } => {
            // A static resource has no completion handler of its own; only
            // templates (whose variables are the thing being completed)
            // support this.
            let Some((handler, _vars)) = resources.match_template(&uri) else {
                return Ok(CompletionResult::empty());
            };
            let values = handler.complete(&argument.name, &argument.value).await;
            Ok(CompletionResult { values, has_more: None })
        }
    }
}
