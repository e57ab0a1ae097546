//! Registry of live SSE connections, keyed by session ID, so a POST to the
//! message endpoint can find the right GET stream to push its response on.

use dashmap::DashMap;
use mcpcore_core::SessionId;
use tokio::sync::mpsc;

use crate::frame::SseFrame;

#[derive(Default)]
pub struct SseConnections {
    senders: DashMap<SessionId, mpsc::Sender<SseFrame>>,
}

impl SseConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: SessionId, sender: mpsc::Sender<SseFrame>) {
        self.senders.insert(session_id, sender);
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.senders.remove(session_id);
    }

    pub async fn push(&self, session_id: &SessionId, frame: SseFrame) -> bool {
        let sender = self.senders.get(session_id).map(|e| e.value().clone());
        match sender {
            Some(sender) => sender.send(frame).await.is_ok(),
            None => false,
        }
    }
}
