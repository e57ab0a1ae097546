//! Line-delimited stdio transport (§4.8.3).

pub mod child_process;
pub mod transport;

pub use child_process::{ChildProcessConfig, ChildProcessLauncher};
pub use transport::StdioTransport;
