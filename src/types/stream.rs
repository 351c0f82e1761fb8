//! Streaming types.

use serde::{Deserialize, Serialize};

use super::chat::RecordId;

/// Body of `POST /chat/api/stream/`.
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    pub message: String,
    pub session_id: Option<RecordId>,
    pub model: Option<String>,
    pub deep_thinking: bool,
}

impl StreamRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            model: None,
            deep_thinking: false,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<RecordId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_deep_thinking(mut self, enabled: bool) -> Self {
        self.deep_thinking = enabled;
        self
    }
}

/// JSON payload carried by one `data:` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// An event decoded from the streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental answer text.
    Content(String),
    /// Incremental reasoning text (deep-thinking models only).
    Thinking(String),
    /// The `[DONE]` sentinel. Nothing follows it.
    Done,
}

/// Text accumulated over a whole stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub content: String,
    pub thinking: String,
    /// Whether the server sent `[DONE]` rather than just closing the body.
    pub finished: bool,
}
