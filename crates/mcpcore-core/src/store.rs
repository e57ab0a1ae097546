//! The session table: create, look up, and terminate sessions, with
//! termination callbacks for interested capability managers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::session::{Session, SessionMode};
use crate::session_id::SessionId;

/// Invoked once a session has been fully torn down, so capability managers
/// (resource subscriptions, pending server-to-client requests) can clean up
/// anything keyed on the session.
pub type TerminationHook = Arc<dyn Fn(&SessionId) + Send + Sync>;

pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    mode: SessionMode,
    notification_buffer: usize,
    hooks: RwLock<Vec<TerminationHook>>,
}

impl SessionStore {
    pub fn new(mode: SessionMode, notification_buffer: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            mode,
            notification_buffer,
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn on_terminated(&self, hook: TerminationHook) {
        self.hooks.write().push(hook);
    }

    /// Create a new session. In stateless mode the caller is still handed a
    /// session value (so request handling stays uniform) but is expected to
    /// discard it rather than retain it across requests.
    pub fn create(&self) -> Arc<Session> {
        let session = Session::with_buffer(self.mode, self.notification_buffer);
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        debug!(session_id = %session.id, "session created");
        session
    }

    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn active_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Terminate and evict a session, cancelling its pending work and
    /// notifying every registered termination hook.
    pub fn terminate(&self, id: &SessionId) -> bool {
        let session = self.sessions.write().remove(id);
        match session {
            Some(session) => {
                session.terminate();
                for hook in self.hooks.read().iter() {
                    hook(id);
                }
                debug!(session_id = %id, "session terminated");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn create_then_lookup_round_trips() {
        let store = SessionStore::new(SessionMode::Stateful, 10);
        let session = store.create();
        assert!(store.lookup(&session.id).is_some());
    }

    #[test]
    fn terminate_unknown_session_returns_false() {
        let store = SessionStore::new(SessionMode::Stateful, 10);
        let bogus = SessionId::generate();
        assert!(!store.terminate(&bogus));
    }

    #[test]
    fn terminate_evicts_and_fires_hooks() {
        let store = SessionStore::new(SessionMode::Stateful, 10);
        let session = store.create();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        store.on_terminated(Arc::new(move |_id| {
            fired2.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(store.terminate(&session.id));
        assert!(store.lookup(&session.id).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
