//! Authenticated client for the AI chat backend.
//!
//! A shared [`TokenStore`](auth::TokenStore) holds the access/refresh pair.
//! [`ApiClient`](client::ApiClient) attaches the access token to every
//! request and recovers from a single `401` per request by refreshing it.
//! [`Router`](router::Router) guards the client-side views, and the
//! [`chat`] and [`stream`] modules cover the conversation endpoints.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use aichat::prelude::*;
//!
//! # async fn example() -> aichat::error::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let tokens = Arc::new(TokenStore::open(Arc::new(FileCredentialStorage::new(
//!     config.credentials_path(),
//! )))?);
//! let client = ApiClient::builder().config(config).tokens(tokens).build()?;
//!
//! let chat = ChatApi::new(client);
//! let summary = chat
//!     .stream_with(
//!         &StreamRequest::new("Hello!"),
//!         StreamCallbacks::new().on_message(|text| print!("{text}")),
//!     )
//!     .await?;
//! println!("\n{} chars", summary.content.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod router;
pub mod stream;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
