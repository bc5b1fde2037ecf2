pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod format;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use api::{ApiReply, HttpTransport, Transport};
pub use auth::{AuthFlow, AuthKind, AuthOutcome, Credentials};
pub use chat::{ChatExchange, ChatOutcome, ClearOutcome, PendingReply};
pub use config::{AuthMode, Config};
pub use conversation::{ChatRole, Conversation, Message, MessageHandle, MessageStatus};
pub use session::Session;
pub use view::{AuthView, ChatView, Navigator, Surface};
