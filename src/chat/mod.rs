//! Chat endpoints: sessions, messages and models.

pub mod store;

pub use store::{ChatState, ChatStore, CurrentSession};

use tracing::debug;

use crate::client::{ApiClient, PendingRequest, CHAT_PATH};
use crate::error::{ClientError, Result};
use crate::stream::{EventStream, StreamCallbacks};
use crate::types::{
    ChatSession, ModelCatalog, NewSession, RecordId, RenameResponse, RenameSession, SendMessage,
    SendMessageResponse, SessionHistory, SessionList, StreamRequest, StreamSummary,
};

const SESSIONS_PATH: &str = "/chat/sessions/";
const MODELS_PATH: &str = "/chat/models/";

fn session_path(id: &RecordId) -> String {
    format!("{SESSIONS_PATH}{id}/")
}

/// Typed wrapper over the chat endpoints.
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: ApiClient,
}

impl ChatApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// All sessions of the current user, newest first as the server orders them.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let list: SessionList = self.client.get(SESSIONS_PATH).await?;
        Ok(list.into_sessions())
    }

    pub async fn create_session(&self, title: impl Into<String>) -> Result<ChatSession> {
        let body = NewSession {
            title: title.into(),
        };
        self.client.post(SESSIONS_PATH, &body).await
    }

    pub async fn session_history(&self, id: &RecordId) -> Result<SessionHistory> {
        self.client
            .get(&format!("{}history/", session_path(id)))
            .await
    }

    pub async fn rename_session(
        &self,
        id: &RecordId,
        title: impl Into<String>,
    ) -> Result<RenameResponse> {
        let body = RenameSession {
            title: title.into(),
        };
        self.client
            .post(&format!("{}rename/", session_path(id)), &body)
            .await
    }

    pub async fn delete_session(&self, id: &RecordId) -> Result<()> {
        self.client.delete(&session_path(id)).await
    }

    /// Non-streaming exchange. Waits for the full model reply under the
    /// chat timeout.
    ///
    /// A `200` carrying `success: false` is reported as an API error.
    pub async fn send_message(&self, message: &SendMessage) -> Result<SendMessageResponse> {
        let response: SendMessageResponse = self
            .client
            .execute(PendingRequest::post(CHAT_PATH, message)?)
            .await?
            .json()?;
        if !response.success {
            let reason = response
                .error
                .clone()
                .unwrap_or_else(|| "Failed to send message".to_string());
            debug!(error = %reason, "chat endpoint reported failure");
            return Err(ClientError::api(200, reason));
        }
        Ok(response)
    }

    pub async fn available_models(&self) -> Result<ModelCatalog> {
        self.client.get(MODELS_PATH).await
    }

    pub fn stream(&self, request: &StreamRequest) -> Result<EventStream> {
        self.client.stream_events(request)
    }

    pub async fn stream_with(
        &self,
        request: &StreamRequest,
        callbacks: StreamCallbacks,
    ) -> Result<StreamSummary> {
        self.client.stream_chat(request, callbacks).await
    }
}
