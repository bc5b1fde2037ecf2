//! Test doubles for the transport and the view traits

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::{ApiReply, Transport};
use crate::conversation::Conversation;
use crate::view::{AuthView, ChatView, Navigator, Surface};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub body: Value,
    pub token: Option<String>,
}

/// Replays queued replies; `None` simulates a transport failure
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Option<ApiReply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Some(ApiReply::new(status, body)));
        self
    }

    pub fn fail(self) -> Self {
        self.replies.lock().unwrap().push_back(None);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Result<ApiReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            body,
            token: token.map(str::to_string),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(anyhow!("connection refused")),
            None => Err(anyhow!("no reply queued")),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeAuthView {
    pub navigations: Vec<Surface>,
    pub alerts: Vec<String>,
    pub inline_errors: Vec<String>,
    pub submit_label: String,
    pub submit_enabled: bool,
    /// Every (label, enabled) pair the flow set, in order
    pub submit_history: Vec<(String, bool)>,
}

impl FakeAuthView {
    pub fn new() -> Self {
        Self {
            submit_label: "Log In".to_string(),
            submit_enabled: true,
            ..Self::default()
        }
    }
}

impl Navigator for FakeAuthView {
    fn navigate(&mut self, surface: Surface) {
        self.navigations.push(surface);
    }
}

impl AuthView for FakeAuthView {
    fn set_submit_state(&mut self, label: &str, enabled: bool) {
        self.submit_label = label.to_string();
        self.submit_enabled = enabled;
        self.submit_history.push((label.to_string(), enabled));
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn inline_error(&mut self, message: &str) {
        self.inline_errors.push(message.to_string());
    }
}

#[derive(Debug, Default)]
pub struct FakeChatView {
    pub input: String,
    pub log: Conversation,
    pub navigations: Vec<Surface>,
}

impl FakeChatView {
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.to_string(),
            ..Self::default()
        }
    }
}

impl Navigator for FakeChatView {
    fn navigate(&mut self, surface: Surface) {
        self.navigations.push(surface);
        if surface != Surface::Chat {
            self.log.reset();
        }
    }
}

impl ChatView for FakeChatView {
    fn input_text(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn conversation(&mut self) -> &mut Conversation {
        &mut self.log
    }
}
