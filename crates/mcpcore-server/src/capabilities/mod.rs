pub mod completion;
pub mod prompt;
pub mod resource;
pub mod tool;

use std::sync::Arc;

/// The four capability registries a server instance owns.
#[derive(Clone)]
pub struct Capabilities {
    pub tools: Arc<tool::ToolRegistry>,
    pub resources: Arc<resource::ResourceRegistry>,
    pub prompts: Arc<prompt::PromptRegistry>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            tools: Arc::new(tool::ToolRegistry::new()),
            resources: Arc::new(resource::ResourceRegistry::new()),
            prompts: Arc::new(prompt::PromptRegistry::new()),
        }
    }
}
