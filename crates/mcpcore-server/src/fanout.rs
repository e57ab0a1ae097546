//! Notification fan-out: single-session, broadcast, and filtered delivery (§4.9).

use mcpcore_core::{NotifyOutcome, SessionId, SessionMode, SessionStore};
use mcpcore_protocol::JsonRpcNotification;

use crate::error::{ServerError, ServerResult};

fn notify_outcome_to_result(session_id: &SessionId, outcome: NotifyOutcome) -> ServerResult<()> {
    match outcome {
        NotifyOutcome::Sent => Ok(()),
        NotifyOutcome::Full => Err(ServerError::NotificationChannelFull(session_id.to_string())),
        NotifyOutcome::Closed => Err(ServerError::NotificationChannelClosed(session_id.to_string())),
    }
}

pub struct NotificationFanout<'a> {
    store: &'a SessionStore,
}

impl<'a> NotificationFanout<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    fn require_stateful(&self) -> ServerResult<()> {
        if self.store.mode() == SessionMode::Stateless {
            Err(ServerError::StatelessMode)
        } else {
            Ok(())
        }
    }

    /// Error if the session is unknown, or if its notification channel is
    /// full or closed.
    pub fn send_notification(
        &self,
        session_id: &SessionId,
        notification: JsonRpcNotification,
    ) -> ServerResult<()> {
        self.require_stateful()?;
        let session = self
            .store
            .lookup(session_id)
            .ok_or_else(|| ServerError::Core(mcpcore_core::McpError::SessionNotFound(session_id.to_string())))?;
        notify_outcome_to_result(session_id, session.notify(notification))
    }

    /// Enqueue on every active session. Returns the count of successful
    /// enqueues; errors only if every session's enqueue failed (a
    /// zero-session server still returns `Ok(0)`, not an error).
    pub fn broadcast(&self, notification: JsonRpcNotification) -> ServerResult<usize> {
        self.require_stateful()?;
        let sessions = self.store.active_sessions();
        let total = sessions.len();
        let succeeded = sessions
            .iter()
            .filter(|session| session.notify(notification.clone()) == NotifyOutcome::Sent)
            .count();
        if total > 0 && succeeded == 0 {
            return Err(ServerError::NotificationChannelFull("all sessions".to_string()));
        }
        Ok(succeeded)
    }

    /// Enqueue on every active session for which `filter` returns true.
    /// Returns `(succeeded, failed)`, counting only sessions the filter
    /// selected; a session the filter excludes is neither attempted nor
    /// counted.
    pub fn send_filtered(
        &self,
        notification: JsonRpcNotification,
        filter: impl Fn(&SessionId) -> bool,
    ) -> ServerResult<(usize, usize)> {
        self.require_stateful()?;
        let sessions = self.store.active_sessions();
        let mut succeeded = 0;
        let mut failed = 0;
        for session in sessions {
            if !filter(&session.id) {
                continue;
            }
            match session.notify(notification.clone()) {
                NotifyOutcome::Sent => succeeded += 1,
                NotifyOutcome::Full | NotifyOutcome::Closed => failed += 1,
            }
        }
        Ok((succeeded, failed))
    }
}
