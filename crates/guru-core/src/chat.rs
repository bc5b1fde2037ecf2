//! Sending a chat message
//!
//! Every send appends the user's message and a pending assistant message,
//! then settles the pending message into exactly one terminal state:
//!
//! ```text
//! Pending -> Resolved | RateLimited | Errored | ConnectionLost
//! ```
//!
//! Nothing is retried automatically. [`ChatExchange::retry_prompt`] lets a
//! front end offer a manual retry.

use anyhow::Result;
use std::sync::Arc;

use crate::api::{ApiReply, ChatRequest, ChatResponse, Transport};
use crate::conversation::{ChatRole, Conversation, MessageHandle, MessageStatus};
use crate::session::Session;
use crate::view::{ChatView, Surface};

pub const THINKING: &str = "GURU is thinking...";
pub const RATE_LIMITED: &str = "GURU is resting: Daily limit reached. Try again in 60 seconds.";
pub const GENERIC_ERROR: &str = "Something went wrong.";
pub const CONNECTION_LOST: &str = "Connection lost. Please check your network.";

const STATUS_UNAUTHORIZED: u16 = 401;
const STATUS_RATE_LIMITED: u16 = 429;

/// A message that has been shown and is waiting for its reply
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub message: String,
    pub handle: MessageHandle,
}

/// How the backend answered a chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied(String),
    RateLimited,
    /// 401; carries the server detail if any
    Unauthorized(Option<String>),
    /// Any other non-2xx; carries the server detail if any
    Failed(Option<String>),
    ConnectionLost,
}

impl ChatOutcome {
    pub fn classify(result: Result<ApiReply>) -> Self {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                return ChatOutcome::ConnectionLost;
            }
        };

        if reply.status == STATUS_RATE_LIMITED {
            tracing::warn!("Chat request rate limited");
            return ChatOutcome::RateLimited;
        }

        let response: ChatResponse = reply.decode();
        let detail = response.error.filter(|e| !e.trim().is_empty());

        if reply.status == STATUS_UNAUTHORIZED {
            tracing::warn!("Chat request unauthorized, session expired");
            return ChatOutcome::Unauthorized(detail);
        }

        if !reply.is_success() {
            tracing::warn!("Chat request failed with status {}", reply.status);
            return ChatOutcome::Failed(detail);
        }

        match response.reply {
            Some(reply) => ChatOutcome::Replied(reply),
            None => {
                tracing::warn!("Chat response {} carried no reply", reply.status);
                ChatOutcome::Failed(None)
            }
        }
    }

    pub fn status(&self) -> MessageStatus {
        match self {
            ChatOutcome::Replied(_) => MessageStatus::Resolved,
            ChatOutcome::RateLimited => MessageStatus::RateLimited,
            ChatOutcome::Unauthorized(_) | ChatOutcome::Failed(_) => MessageStatus::Errored,
            ChatOutcome::ConnectionLost => MessageStatus::ConnectionLost,
        }
    }

    /// Text that replaces the pending message
    pub fn text(&self) -> String {
        match self {
            ChatOutcome::Replied(reply) => reply.clone(),
            ChatOutcome::RateLimited => RATE_LIMITED.to_string(),
            ChatOutcome::Unauthorized(detail) | ChatOutcome::Failed(detail) => {
                format!("Error: {}", detail.as_deref().unwrap_or(GENERIC_ERROR))
            }
            ChatOutcome::ConnectionLost => CONNECTION_LOST.to_string(),
        }
    }
}

/// Result of asking the backend to forget the stored history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Unauthorized,
    Failed(String),
}

#[derive(Clone)]
pub struct ChatExchange {
    transport: Arc<dyn Transport>,
}

impl ChatExchange {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send whatever is in the view's input. Returns `None` when the input
    /// was empty and nothing happened.
    pub async fn send_message<V: ChatView + ?Sized>(
        &self,
        session: &mut Session,
        view: &mut V,
    ) -> Option<ChatOutcome> {
        let pending = Self::begin(view)?;
        let token = session.token().map(str::to_string);
        let outcome = self.request(&pending.message, token).await;
        Self::settle(session, view, &pending, outcome.clone());
        Some(outcome)
    }

    /// Take the input and show the user message plus a pending reply
    pub fn begin<V: ChatView + ?Sized>(view: &mut V) -> Option<PendingReply> {
        let message = view.input_text().trim().to_string();
        if message.is_empty() {
            return None;
        }

        view.clear_input();
        let log = view.conversation();
        log.append(ChatRole::User, &message);
        let handle = log.append_pending(ChatRole::Assistant, THINKING);

        Some(PendingReply { message, handle })
    }

    pub async fn request(&self, message: &str, token: Option<String>) -> ChatOutcome {
        let body = match serde_json::to_value(ChatRequest { message }) {
            Ok(body) => body,
            Err(e) => return ChatOutcome::Failed(Some(e.to_string())),
        };
        tracing::debug!("Sending chat message ({} chars)", message.chars().count());
        let result = self.transport.post_json("chat", body, token.as_deref()).await;
        ChatOutcome::classify(result)
    }

    /// Move the pending message to its terminal state.
    ///
    /// Returns false if the view has moved on to another conversation; the
    /// outcome is then dropped without touching the session.
    pub fn settle<V: ChatView + ?Sized>(
        session: &mut Session,
        view: &mut V,
        pending: &PendingReply,
        outcome: ChatOutcome,
    ) -> bool {
        let log = view.conversation();
        if !log.is_current(pending.handle) {
            tracing::debug!("Dropping reply for a conversation that is no longer shown");
            return false;
        }

        log.resolve(pending.handle, &outcome.text(), outcome.status());

        if let ChatOutcome::Unauthorized(_) = outcome {
            let next = session.clear();
            view.navigate(next);
        }
        true
    }

    /// The most recent user message whose reply failed, if the last exchange
    /// failed
    pub fn retry_prompt(log: &Conversation) -> Option<String> {
        let messages = log.messages();
        let reply = messages.last()?;
        if reply.role != ChatRole::Assistant || !reply.status.is_failure() {
            return None;
        }
        let prompt = messages.get(messages.len().checked_sub(2)?)?;
        (prompt.role == ChatRole::User).then(|| prompt.content.clone())
    }

    pub async fn clear_history(&self, token: Option<String>) -> ClearOutcome {
        let result = self
            .transport
            .post_json("clear", serde_json::json!({}), token.as_deref())
            .await;

        match result {
            Ok(reply) if reply.is_success() => ClearOutcome::Cleared,
            Ok(reply) if reply.status == STATUS_UNAUTHORIZED => ClearOutcome::Unauthorized,
            Ok(reply) => {
                let response: ChatResponse = reply.decode();
                ClearOutcome::Failed(format!(
                    "Error: {}",
                    response.error.as_deref().unwrap_or(GENERIC_ERROR)
                ))
            }
            Err(e) => {
                tracing::error!("Clear history request failed: {}", e);
                ClearOutcome::Failed(CONNECTION_LOST.to_string())
            }
        }
    }

    /// Apply a clear-history result to the session. Returns the surface to
    /// move to, if any.
    pub fn finish_clear(session: &mut Session, outcome: &ClearOutcome) -> Option<Surface> {
        match outcome {
            ClearOutcome::Unauthorized => Some(session.clear()),
            ClearOutcome::Cleared | ClearOutcome::Failed(_) => None,
        }
    }
}
