//! Convenience re-exports for common use.

pub use crate::auth::{AuthSession, FileCredentialStorage, TokenStore};
pub use crate::chat::{ChatApi, ChatStore};
pub use crate::client::{ApiClient, Navigator, Notice, Notifier};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, Result};
pub use crate::router::{Route, Router};
pub use crate::stream::{EventStream, StreamCallbacks};
pub use crate::types::{LoginRequest, StreamEvent, StreamRequest, StreamSummary};
