//! Header construction and response-error normalization.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use tracing::warn;

use crate::error::ClientError;

/// Headers for one request, given the `Authorization` value read at send time.
///
/// No token, no `Authorization` header.
pub fn request_headers(authorization: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(authorization) = authorization {
        match sensitive(authorization) {
            Some(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("stored access token is not valid header text; sending without it"),
        }
    }
    headers
}

/// Header value marked sensitive. `None` when `text` is not valid header text.
pub fn sensitive(text: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(text).ok()?;
    value.set_sensitive(true);
    Some(value)
}

/// Pull a human-readable message out of an error body.
///
/// Priority: `error` field, then `message` field.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"].iter().find_map(|field| match value.get(field)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) if text.trim().is_empty() => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    })
}

/// Normalize a non-success response into a [`ClientError`].
pub fn status_to_error(status: u16, body: &str) -> ClientError {
    let message = extract_error_message(body)
        .unwrap_or_else(|| format!("Request failed with status code {status}"));
    match status {
        401 => ClientError::Unauthorized(message),
        _ => ClientError::api(status, message),
    }
}

/// Map a transport failure, distinguishing the request timeout.
pub fn transport_error(error: reqwest::Error, timeout: Duration) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout(timeout.as_millis() as u64)
    } else {
        ClientError::Network(error)
    }
}
