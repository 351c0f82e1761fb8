//! Credential storage and the authenticated session.

pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use session::AuthSession;
pub use store::{
    default_credentials_path, CredentialStorage, FileCredentialStorage, MemoryCredentialStorage,
    TokenStore,
};
pub use token::{AccessClaims, Credentials};
