//! Local mirror of the user's chat state.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::types::{
    ChatMessage, ChatSession, ModelCatalog, ModelEntry, RecordId, SendMessage,
    SendMessageResponse, SessionHistory,
};

use super::ChatApi;

/// The session the user is looking at.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSession {
    pub id: RecordId,
    pub title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CurrentSession {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            title: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<&ChatSession> for CurrentSession {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            title: Some(session.title.clone()),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Snapshot of everything [`ChatStore`] tracks.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub sessions: Vec<ChatSession>,
    pub current_session: Option<CurrentSession>,
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub available_models: Vec<ModelEntry>,
    pub selected_model: String,
}

impl ChatState {
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Keeps [`ChatState`] in step with the server.
///
/// Each operation calls the API first and only touches local state on
/// success. The state lock is never held across a request.
#[derive(Debug)]
pub struct ChatStore {
    api: ChatApi,
    state: RwLock<ChatState>,
}

impl ChatStore {
    pub fn new(api: ChatApi) -> Self {
        Self {
            api,
            state: RwLock::new(ChatState::default()),
        }
    }

    pub fn api(&self) -> &ChatApi {
        &self.api
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.read().clone()
    }

    pub fn current_session(&self) -> Option<CurrentSession> {
        self.state.read().current_session.clone()
    }

    pub fn selected_model(&self) -> String {
        self.state.read().selected_model.clone()
    }

    pub fn select_model(&self, model: impl Into<String>) {
        self.state.write().selected_model = model.into();
    }

    pub async fn fetch_sessions(&self) -> Result<Vec<ChatSession>> {
        let sessions = self.api.list_sessions().await?;
        self.state.write().sessions = sessions.clone();
        Ok(sessions)
    }

    /// New sessions go to the front of the list.
    pub async fn create_session(&self, title: impl Into<String>) -> Result<ChatSession> {
        let session = self.api.create_session(title).await?;
        self.state.write().sessions.insert(0, session.clone());
        Ok(session)
    }

    /// Load a session's messages and make it current.
    pub async fn fetch_session_history(&self, id: &RecordId) -> Result<SessionHistory> {
        let history = self.api.session_history(id).await?;
        let mut state = self.state.write();
        state.messages = history.messages.clone();
        state.current_session = Some(CurrentSession {
            id: history.id.clone(),
            title: Some(history.title.clone()),
            created_at: history.created_at,
            updated_at: history.updated_at,
        });
        Ok(history)
    }

    /// Send through the non-streaming endpoint.
    ///
    /// Without an explicit model the selected one is used. Both returned
    /// messages are appended, and a first message with no current session
    /// adopts the session the server created.
    pub async fn send_message(
        &self,
        message: impl Into<String>,
        session_id: Option<RecordId>,
        model: Option<String>,
    ) -> Result<SendMessageResponse> {
        let model = model.or_else(|| {
            let selected = self.selected_model();
            (!selected.is_empty()).then_some(selected)
        });
        let request = SendMessage {
            message: message.into(),
            session_id,
            model,
        };

        self.state.write().is_loading = true;
        let result = self.api.send_message(&request).await;
        let mut state = self.state.write();
        state.is_loading = false;

        let response = result?;
        state
            .messages
            .extend(response.user_message.iter().chain(&response.ai_message).cloned());
        if state.current_session.is_none() {
            if let Some(id) = &response.session_id {
                state.current_session = Some(CurrentSession::new(id.clone()));
            }
        }
        Ok(response)
    }

    /// Load the model list and adopt the server's default selection.
    pub async fn fetch_available_models(&self) -> Result<ModelCatalog> {
        let catalog = self.api.available_models().await?;
        let mut state = self.state.write();
        state.available_models = catalog.models.clone();
        state.selected_model = catalog.default_model.clone().unwrap_or_default();
        Ok(catalog)
    }

    pub async fn rename_session(&self, id: &RecordId, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.api.rename_session(id, title.clone()).await?;
        let mut state = self.state.write();
        if let Some(session) = state.sessions.iter_mut().find(|s| &s.id == id) {
            session.title = title.clone();
        }
        if let Some(current) = state.current_session.as_mut().filter(|c| &c.id == id) {
            current.title = Some(title);
        }
        Ok(())
    }

    /// Deleting the current session also clears the open conversation.
    pub async fn delete_session(&self, id: &RecordId) -> Result<()> {
        self.api.delete_session(id).await?;
        let mut state = self.state.write();
        state.sessions.retain(|s| &s.id != id);
        if state.current_session.as_ref().is_some_and(|c| &c.id == id) {
            state.current_session = None;
            state.messages.clear();
        }
        Ok(())
    }

    pub fn clear_current_session(&self) {
        let mut state = self.state.write();
        state.current_session = None;
        state.messages.clear();
    }

    pub fn set_current_session(&self, session: CurrentSession) {
        let mut state = self.state.write();
        state.current_session = Some(session);
        state.messages.clear();
    }
}
