//! Chat session, message and model payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a session or message. The backend issues integers for some
/// records and UUID strings for others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        id.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(id.to_string()))
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

/// Preview of the newest message in a session listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub is_user: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A conversation as listed by `GET /chat/sessions/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: Option<u64>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

/// A single stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub content: String,
    pub is_user: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Session listing: a bare array or a paginated `{results}` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SessionList {
    Page { results: Vec<ChatSession> },
    Plain(Vec<ChatSession>),
}

impl SessionList {
    pub fn into_sessions(self) -> Vec<ChatSession> {
        match self {
            Self::Page { results } => results,
            Self::Plain(sessions) => sessions,
        }
    }
}

/// Response of `GET /chat/sessions/{id}/history/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionHistory {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body of `POST /chat/sessions/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub title: String,
}

/// Body of `POST /chat/sessions/{id}/rename/`.
#[derive(Debug, Clone, Serialize)]
pub struct RenameSession {
    pub title: String,
}

/// Response of a rename.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /chat/chat/`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub message: String,
    pub session_id: Option<RecordId>,
    pub model: Option<String>,
}

/// Response of `POST /chat/chat/`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(default)]
    pub user_message: Option<ChatMessage>,
    #[serde(default)]
    pub ai_message: Option<ChatMessage>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A model offered by `GET /chat/models/`: a plain name or a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelEntry {
    Detailed {
        value: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        supports_thinking: bool,
    },
    Name(String),
}

impl ModelEntry {
    /// Identifier to send back as `model`.
    pub fn value(&self) -> &str {
        match self {
            Self::Detailed { value, .. } => value,
            Self::Name(name) => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Detailed { label, value, .. } => label.as_deref().unwrap_or(value),
            Self::Name(name) => name,
        }
    }

    pub fn supports_thinking(&self) -> bool {
        matches!(self, Self::Detailed { supports_thinking: true, .. })
    }
}

/// Response of `GET /chat/models/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub default_model: Option<String>,
}
