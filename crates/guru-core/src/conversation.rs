//! Append-only conversation log
//!
//! Each visit to the chat surface gets its own epoch. Handles returned by
//! [`Conversation::append`] carry that epoch, so a reply that arrives after
//! the user has navigated away cannot touch the new log.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Display state of a message. `Pending` moves to exactly one of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Pending,
    Resolved,
    RateLimited,
    Errored,
    ConnectionLost,
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }

    /// The reply did not arrive; the prompt is a candidate for a manual retry
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            MessageStatus::RateLimited | MessageStatus::Errored | MessageStatus::ConnectionLost
        )
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
    pub status: MessageStatus,
}

/// Refers to one message of one conversation epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    index: usize,
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    epoch: u64,
    reveal_latest: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a settled message (user input, notices)
    pub fn append(&mut self, role: ChatRole, text: &str) -> MessageHandle {
        self.push(role, text, MessageStatus::Resolved)
    }

    /// Append a placeholder that will later be resolved in place
    pub fn append_pending(&mut self, role: ChatRole, text: &str) -> MessageHandle {
        self.push(role, text, MessageStatus::Pending)
    }

    fn push(&mut self, role: ChatRole, text: &str, status: MessageStatus) -> MessageHandle {
        self.messages.push(Message {
            role,
            content: text.to_string(),
            status,
        });
        self.reveal_latest = true;
        MessageHandle {
            index: self.messages.len() - 1,
            epoch: self.epoch,
        }
    }

    /// Move a pending message to its terminal state.
    ///
    /// Returns false when the handle is stale or the message already settled.
    pub fn resolve(&mut self, handle: MessageHandle, text: &str, status: MessageStatus) -> bool {
        if handle.epoch != self.epoch {
            return false;
        }
        match self.messages.get_mut(handle.index) {
            Some(msg) if msg.status == MessageStatus::Pending => {
                msg.content = text.to_string();
                msg.status = status;
                self.reveal_latest = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, handle: MessageHandle) -> Option<&Message> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.messages.get(handle.index)
    }

    pub fn is_current(&self, handle: MessageHandle) -> bool {
        handle.epoch == self.epoch && handle.index < self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.status == MessageStatus::Pending)
    }

    /// Discard the log and start a new epoch
    pub fn reset(&mut self) {
        self.messages.clear();
        self.epoch += 1;
        self.reveal_latest = true;
    }

    /// True once after each change, so the view can scroll to the newest entry
    pub fn take_reveal(&mut self) -> bool {
        std::mem::take(&mut self.reveal_latest)
    }
}
