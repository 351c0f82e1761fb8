//! Client configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

use crate::auth::store::default_credentials_path;
use crate::error::{ClientError, Result};

/// API base used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
/// Bound on ordinary requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on the blocking chat endpoint, which waits on model inference.
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(120);
/// Cancellation deadline armed for each streaming call.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings shared by every request a client issues.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use aichat::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_base("https://chat.example.com/api")
///     .stream_timeout(Duration::from_secs(60))
///     .build();
/// assert_eq!(config.url("/chat/models/"), "https://chat.example.com/api/chat/models/");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_API_BASE.to_string())]
    pub api_base: String,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    #[builder(default = DEFAULT_CHAT_TIMEOUT)]
    pub chat_timeout: Duration,
    #[builder(default = DEFAULT_STREAM_TIMEOUT)]
    pub stream_timeout: Duration,
    /// Share one in-flight refresh between concurrently failing requests.
    #[builder(default = true)]
    pub coalesce_refresh: bool,
    #[builder(into)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Load from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base) = lookup("AICHAT_API_BASE") {
            config.api_base = base;
        }
        if let Some(secs) = lookup("AICHAT_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("AICHAT_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("AICHAT_CHAT_TIMEOUT_SECS") {
            config.chat_timeout = parse_secs("AICHAT_CHAT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("AICHAT_STREAM_TIMEOUT_SECS") {
            config.stream_timeout = parse_secs("AICHAT_STREAM_TIMEOUT_SECS", &secs)?;
        }
        if let Some(flag) = lookup("AICHAT_COALESCE_REFRESH") {
            config.coalesce_refresh = parse_flag("AICHAT_COALESCE_REFRESH", &flag)?;
        }
        if let Some(path) = lookup("AICHAT_CREDENTIALS_PATH") {
            config.credentials_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Absolute URL for an API-relative path.
    pub fn url(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Where the file-backed credential storage lives.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(default_credentials_path)
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ClientError::Configuration(format!("{var} must be whole seconds, got {raw:?}")))
}

fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ClientError::Configuration(format!(
            "{var} must be a boolean, got {raw:?}"
        ))),
    }
}
