//! Wire types exchanged with the chat backend.

pub mod account;
pub mod chat;
pub mod stream;

pub use account::*;
pub use chat::*;
pub use stream::*;
