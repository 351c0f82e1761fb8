//! Side-channel seams: user-facing notices and application navigation.

use parking_lot::Mutex;
use tracing::{error, warn};

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Refresh failed; the user has to log in again.
    SessionExpired,
    /// A request failed with a normalized message.
    RequestFailed { status: Option<u16>, message: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::SessionExpired => "Login expired, please log in again".to_string(),
            Self::RequestFailed { message, .. } => message.clone(),
        }
    }
}

/// Surface for transient user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::SessionExpired => warn!("{}", notice.message()),
            Notice::RequestFailed { status, message } => {
                error!(status = ?status, "{message}")
            }
        }
    }
}

/// Collects notices in memory, newest last.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Application location, as seen by the HTTP client.
pub trait Navigator: Send + Sync {
    /// Path of the view currently shown.
    fn current_path(&self) -> String;
    /// Replace the current location.
    fn redirect(&self, path: &str);
}
