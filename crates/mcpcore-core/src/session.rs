//! The session model: identity, lifetime, a mutex-protected data bag, a
//! per-request canceler registry, and a bounded outbound notification channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mcpcore_protocol::{JsonRpcNotification, RequestId};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{McpError, McpResult};
use crate::session_id::SessionId;

/// Default capacity of a session's outbound notification channel.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 10;

/// Whether sessions persist across requests or are single-request ephemerals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Stateful,
    Stateless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, handshake not yet complete.
    Pending,
    Active,
    Terminated,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Outcome of a single enqueue attempt on a [`NotificationChannel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// The channel was at capacity; the notification was dropped.
    Full,
    /// No receiver remains (the owning transport disconnected); the
    /// notification was dropped.
    Closed,
}

/// A bounded queue of outbound notifications for one session.
///
/// Overflow drops the notification rather than blocking the producer; the
/// number of drops is tracked so it can be surfaced through diagnostics.
pub struct NotificationChannel {
    sender: mpsc::Sender<JsonRpcNotification>,
    receiver: Mutex<Option<mpsc::Receiver<JsonRpcNotification>>>,
    dropped: AtomicU64,
}

impl NotificationChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Take the receiving half. Returns `None` if already taken (a channel
    /// has exactly one consumer, the owning transport).
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<JsonRpcNotification>> {
        self.receiver.lock().take()
    }

    pub fn try_send(&self, notification: JsonRpcNotification) -> NotifyOutcome {
        match self.sender.try_send(notification) {
            Ok(()) => NotifyOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("notification channel full, dropping notification");
                NotifyOutcome::Full
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("notification channel closed, dropping notification");
                NotifyOutcome::Closed
            }
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A single session's identity, lifecycle state, and owned resources.
pub struct Session {
    pub id: SessionId,
    pub mode: SessionMode,
    state: Mutex<SessionState>,
    created_at: u64,
    last_activity: AtomicU64,
    initialized: AtomicBool,
    data: Mutex<HashMap<String, Value>>,
    cancelers: Mutex<HashMap<RequestId, CancellationToken>>,
    non_cancelable_ids: Mutex<std::collections::HashSet<RequestId>>,
    notifications: NotificationChannel,
    protocol_version: Mutex<Option<String>>,
}

impl Session {
    pub fn new(mode: SessionMode) -> Arc<Self> {
        Self::with_buffer(mode, DEFAULT_NOTIFICATION_BUFFER)
    }

    pub fn with_buffer(mode: SessionMode, buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::generate(),
            mode,
            state: Mutex::new(SessionState::Pending),
            created_at: now_millis(),
            last_activity: AtomicU64::new(now_millis()),
            initialized: AtomicBool::new(false),
            data: Mutex::new(HashMap::new()),
            cancelers: Mutex::new(HashMap::new()),
            non_cancelable_ids: Mutex::new(std::collections::HashSet::new()),
            notifications: NotificationChannel::new(buffer),
            protocol_version: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Active)
    }

    pub fn activate(&self) {
        *self.state.lock() = SessionState::Active;
    }

    pub fn terminate(&self) {
        *self.state.lock() = SessionState::Terminated;
        let mut cancelers = self.cancelers.lock();
        for (_, token) in cancelers.drain() {
            token.cancel();
        }
    }

    pub fn touch(&self) {
        self.last_activity.store(now_millis(), Ordering::Relaxed);
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn last_activity(&self) -> u64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) -> McpResult<()> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(McpError::AlreadyInitialized(self.id.to_string()));
        }
        Ok(())
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.protocol_version.lock().clone()
    }

    pub fn set_protocol_version(&self, version: impl Into<String>) {
        *self.protocol_version.lock() = Some(version.into());
    }

    // -- data bag -----------------------------------------------------

    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    pub fn set_data(&self, key: impl Into<String>, value: Value) {
        self.data.lock().insert(key.into(), value);
    }

    // -- per-request cancellation --------------------------------------

    /// Register a canceler for an in-flight request. Must be matched by
    /// [`Session::deregister_canceler`] on every exit path.
    pub fn register_canceler(&self, request_id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        self.cancelers.lock().insert(request_id, token.clone());
        token
    }

    pub fn deregister_canceler(&self, request_id: &RequestId) {
        self.cancelers.lock().remove(request_id);
    }

    /// Mark a request ID as permanently non-cancelable (the `initialize` request).
    pub fn mark_non_cancelable(&self, request_id: RequestId) {
        self.non_cancelable_ids.lock().insert(request_id);
    }

    /// Handle an inbound `notifications/cancelled` for `request_id`.
    ///
    /// A missing or already-completed ID, or the reserved `initialize` ID, is
    /// silently ignored rather than treated as an error.
    pub fn cancel_request(&self, request_id: &RequestId) {
        if self.non_cancelable_ids.lock().contains(request_id) {
            return;
        }
        if let Some(token) = self.cancelers.lock().get(request_id) {
            token.cancel();
        }
    }

    pub fn pending_request_count(&self) -> usize {
        self.cancelers.lock().len()
    }

    // -- notifications --------------------------------------------------

    /// Enqueue a notification on this session's outbound channel. Returns
    /// whether it was actually enqueued, dropped for being full, or dropped
    /// because nothing is consuming the channel anymore.
    pub fn notify(&self, notification: JsonRpcNotification) -> NotifyOutcome {
        self.notifications.try_send(notification)
    }

    pub fn take_notification_receiver(&self) -> Option<mpsc::Receiver<JsonRpcNotification>> {
        self.notifications.take_receiver()
    }

    pub fn dropped_notification_count(&self) -> u64 {
        self.notifications.dropped_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_session_starts_pending_and_uninitialized() {
        let session = Session::new(SessionMode::Stateful);
        assert_eq!(session.state(), SessionState::Pending);
        assert!(!session.is_initialized());
    }

    #[test]
    fn second_initialize_is_rejected() {
        let session = Session::new(SessionMode::Stateful);
        session.mark_initialized().unwrap();
        assert!(matches!(
            session.mark_initialized(),
            Err(McpError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn data_bag_round_trips() {
        let session = Session::new(SessionMode::Stateful);
        session.set_data("k", json!("v"));
        assert_eq!(session.get_data("k"), Some(json!("v")));
        assert_eq!(session.get_data("missing"), None);
    }

    #[test]
    fn cancel_request_triggers_the_registered_token() {
        let session = Session::new(SessionMode::Stateful);
        let id = RequestId::Number(1);
        let token = session.register_canceler(id.clone());
        assert!(!token.is_cancelled());
        session.cancel_request(&id);
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_of_unknown_id_is_a_silent_no_op() {
        let session = Session::new(SessionMode::Stateful);
        session.cancel_request(&RequestId::Number(999));
    }

    #[test]
    fn non_cancelable_id_ignores_cancel_even_if_registered() {
        let session = Session::new(SessionMode::Stateful);
        let id = RequestId::Number(1);
        let token = session.register_canceler(id.clone());
        session.mark_non_cancelable(id.clone());
        session.cancel_request(&id);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn terminate_cancels_all_pending_requests() {
        let session = Session::new(SessionMode::Stateful);
        let t1 = session.register_canceler(RequestId::Number(1));
        let t2 = session.register_canceler(RequestId::Number(2));
        session.terminate();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
        assert_eq!(session.pending_request_count(), 0);
    }

    #[tokio::test]
    async fn notification_channel_drops_on_overflow_without_blocking() {
        let session = Session::with_buffer(SessionMode::Stateful, 1);
        session.notify(JsonRpcNotification::new("a", None));
        session.notify(JsonRpcNotification::new("b", None));
        assert_eq!(session.dropped_notification_count(), 1);
    }
}
