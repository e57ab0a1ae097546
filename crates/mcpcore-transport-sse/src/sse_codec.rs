//! Pure, no-I/O SSE encoding: fields separated by newlines, events
//! terminated by a blank line. Shared by the dual-endpoint SSE transport and
//! the streamable-HTTP transport's POST-SSE upgrade path.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
    pub retry: Option<u32>,
}

impl SseEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self { id: None, event: None, data: data.into(), retry: None }
    }

    pub fn with_id(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self { id: Some(id.into()), event: None, data: data.into(), retry: None }
    }

    pub fn builder() -> SseEventBuilder {
        SseEventBuilder::default()
    }
}

#[derive(Default)]
pub struct SseEventBuilder {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
    retry: Option<u32>,
}

impl SseEventBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn retry(mut self, retry_ms: u32) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// Returns `None` if no data was set; an SSE event without a `data`
    /// field is legal but useless to this transport.
    pub fn try_build(self) -> Option<SseEvent> {
        Some(SseEvent { id: self.id, event: self.event, data: self.data?, retry: self.retry })
    }
}

pub struct SseEncoder;

impl SseEncoder {
    pub fn encode_string(event: &SseEvent) -> String {
        let mut output = String::new();
        if let Some(ref id) = event.id {
            output.push_str("id: ");
            output.push_str(id);
            output.push('\n');
        }
        if let Some(ref event_type) = event.event {
            output.push_str("event: ");
            output.push_str(event_type);
            output.push('\n');
        }
        if let Some(retry) = event.retry {
            output.push_str("retry: ");
            output.push_str(&retry.to_string());
            output.push('\n');
        }
        for line in event.data.lines() {
            output.push_str("data: ");
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
        output
    }

    pub fn encode_comment(comment: &str) -> String {
        let mut output = String::new();
        for line in comment.lines() {
            output.push_str(": ");
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
        output
    }

    pub fn encode_keepalive() -> String {
        ":\n\n".to_string()
    }
}
