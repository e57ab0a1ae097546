//! Session model and per-request context shared by the dispatch core and
//! every transport.

pub mod context;
pub mod error;
pub mod session;
pub mod session_id;
pub mod store;

pub use context::{ProgressReporter, RequestContext, TransportKind};
pub use error::{McpError, McpResult};
pub use session::{NotificationChannel, NotifyOutcome, Session, SessionMode, SessionState};
pub use session_id::{SessionId, SessionIdError};
pub use store::SessionStore;
