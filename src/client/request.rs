use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::error::Result;

/// One outbound call, as the caller asked for it.
///
/// Carries the single-use `retried` marker that bounds the refresh protocol
/// to one recovery cycle per original request.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// API-relative path, e.g. `/chat/sessions/`.
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Overrides the endpoint-class timeout.
    pub timeout: Option<Duration>,
    retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}
