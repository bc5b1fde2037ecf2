use std::sync::Arc;
use anyhow::anyhow;
use guru_core::api::ApiReply;
use guru_core::auth::AuthKind;
use guru_core::{
    AuthFlow, AuthMode, AuthView, ChatExchange, ChatOutcome, ChatView, ClearOutcome, Conversation,
    Credentials, Navigator, PendingReply, Session, Surface, Transport,
};
use tokio::task::JoinHandle;

pub const HISTORY_CLEARED: &str = "Conversation history cleared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Username,
    Password,
}

/// Everything the user sees. Implements the view capabilities the core
/// flows drive; kept apart from the session so both can be borrowed at once.
pub struct View {
    pub surface: Surface,

    // Login / signup form
    pub username_input: String,
    pub password_input: String,
    pub form_field: FormField,
    pub submit_label: String,
    pub submit_enabled: bool,
    pub form_error: Option<String>,

    // Modal notice
    pub alert: Option<String>,

    // Chat
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input, in chars
    pub conversation: Conversation,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
}

impl View {
    pub fn new(surface: Surface) -> Self {
        let mut view = Self {
            surface,
            username_input: String::new(),
            password_input: String::new(),
            form_field: FormField::Username,
            submit_label: String::new(),
            submit_enabled: true,
            form_error: None,
            alert: None,
            chat_input: String::new(),
            chat_cursor: 0,
            conversation: Conversation::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
        };
        view.navigate(surface);
        view
    }

    pub fn auth_kind(&self) -> Option<AuthKind> {
        match self.surface {
            Surface::Login => Some(AuthKind::Login),
            Surface::Signup => Some(AuthKind::Signup),
            Surface::Chat => None,
        }
    }

    pub fn focused_field_mut(&mut self) -> &mut String {
        match self.form_field {
            FormField::Username => &mut self.username_input,
            FormField::Password => &mut self.password_input,
        }
    }

    pub fn toggle_form_field(&mut self) {
        self.form_field = match self.form_field {
            FormField::Username => FormField::Password,
            FormField::Password => FormField::Username,
        };
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.conversation.messages() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "GURU:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { (char_count / wrap_width) + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }
}

impl Navigator for View {
    fn navigate(&mut self, surface: Surface) {
        tracing::debug!("Navigating to {:?}", surface);

        // Leaving chat ends the conversation; late replies are dropped
        if surface != Surface::Chat {
            self.conversation.reset();
            self.chat_input.clear();
            self.chat_cursor = 0;
            self.chat_scroll = 0;
        }

        match surface {
            Surface::Login | Surface::Signup => {
                self.password_input.clear();
                self.form_field = FormField::Username;
                self.form_error = None;
                self.submit_enabled = true;
                self.submit_label = match surface {
                    Surface::Signup => AuthKind::Signup.idle_label(),
                    _ => AuthKind::Login.idle_label(),
                }
                .to_string();
            }
            Surface::Chat => {
                self.password_input.clear();
                self.form_error = None;
            }
        }

        self.surface = surface;
    }
}

impl AuthView for View {
    fn set_submit_state(&mut self, label: &str, enabled: bool) {
        self.submit_label = label.to_string();
        self.submit_enabled = enabled;
    }

    fn alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }

    fn inline_error(&mut self, message: &str) {
        self.form_error = Some(message.to_string());
    }
}

impl ChatView for View {
    fn input_text(&self) -> String {
        self.chat_input.clone()
    }

    fn clear_input(&mut self) {
        self.chat_input.clear();
        self.chat_cursor = 0;
    }

    fn conversation(&mut self) -> &mut Conversation {
        &mut self.conversation
    }
}

struct AuthTask {
    kind: AuthKind,
    credentials: Credentials,
    handle: JoinHandle<anyhow::Result<ApiReply>>,
}

struct ChatTask {
    pending: PendingReply,
    handle: JoinHandle<ChatOutcome>,
}

pub struct App {
    pub should_quit: bool,
    pub session: Session,
    pub view: View,
    pub api_url: String,
    pub auth_mode: AuthMode,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    auth: AuthFlow,
    chat: ChatExchange,
    auth_task: Option<AuthTask>,
    chat_tasks: Vec<ChatTask>,
    clear_task: Option<JoinHandle<ClearOutcome>>,
}

impl App {
    pub fn new(
        session: Session,
        transport: Arc<dyn Transport>,
        api_url: &str,
        auth_mode: AuthMode,
    ) -> Self {
        // Cookie sessions do not survive a restart, whatever the file holds
        let surface = match auth_mode {
            AuthMode::Bearer => session.initial_surface(),
            AuthMode::Cookie => Surface::Login,
        };
        let view = View::new(surface);
        Self {
            should_quit: false,
            session,
            view,
            api_url: api_url.to_string(),
            auth_mode,
            animation_frame: 0,
            auth: AuthFlow::new(transport.clone(), auth_mode),
            chat: ChatExchange::new(transport),
            auth_task: None,
            chat_tasks: Vec::new(),
            clear_task: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.auth_task.is_some() || !self.chat_tasks.is_empty() || self.clear_task.is_some()
    }

    /// Submit the login or signup form
    pub fn submit_auth(&mut self) {
        let Some(kind) = self.view.auth_kind() else {
            return;
        };
        // The submit control is disabled while its request runs
        if self.auth_task.is_some() || !self.view.submit_enabled {
            return;
        }

        self.view.form_error = None;
        let username = self.view.username_input.clone();
        let password = self.view.password_input.clone();
        let Some(credentials) = AuthFlow::begin(&mut self.view, kind, &username, &password) else {
            return;
        };

        let flow = self.auth.clone();
        let task_credentials = credentials.clone();
        let handle = tokio::spawn(async move { flow.request(kind, &task_credentials).await });
        self.auth_task = Some(AuthTask {
            kind,
            credentials,
            handle,
        });
    }

    /// Send the chat input. Several sends may be in flight at once.
    pub fn send_chat(&mut self) {
        let Some(pending) = ChatExchange::begin(&mut self.view) else {
            return;
        };

        let chat = self.chat.clone();
        let message = pending.message.clone();
        let token = self.session.token().map(str::to_string);
        let handle = tokio::spawn(async move { chat.request(&message, token).await });
        self.chat_tasks.push(ChatTask { pending, handle });
    }

    /// Resend the last prompt whose reply failed
    pub fn retry_last(&mut self) {
        if let Some(prompt) = ChatExchange::retry_prompt(&self.view.conversation) {
            self.view.chat_cursor = prompt.chars().count();
            self.view.chat_input = prompt;
            self.send_chat();
        }
    }

    pub fn clear_history(&mut self) {
        if self.clear_task.is_some() {
            return;
        }
        let chat = self.chat.clone();
        let token = self.session.token().map(str::to_string);
        self.clear_task = Some(tokio::spawn(async move { chat.clear_history(token).await }));
    }

    pub fn logout(&mut self) {
        tracing::info!("Signing out {}", self.session.display_name());
        let next = self.session.clear();
        self.view.navigate(next);
    }

    pub fn switch_auth_surface(&mut self) {
        if self.auth_task.is_some() {
            return;
        }
        match self.view.surface {
            Surface::Login => self.view.navigate(Surface::Signup),
            Surface::Signup => self.view.navigate(Surface::Login),
            Surface::Chat => {}
        }
    }

    /// Apply the results of finished request tasks
    pub async fn poll_tasks(&mut self) {
        if self.auth_task.as_ref().is_some_and(|t| t.handle.is_finished()) {
            if let Some(task) = self.auth_task.take() {
                let result = match task.handle.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("Auth task failed: {}", e)),
                };
                self.auth.finish(
                    &mut self.session,
                    &mut self.view,
                    task.kind,
                    &task.credentials,
                    result,
                );
            }
        }

        let (finished, running): (Vec<ChatTask>, Vec<ChatTask>) = std::mem::take(&mut self.chat_tasks)
            .into_iter()
            .partition(|t| t.handle.is_finished());
        self.chat_tasks = running;

        for task in finished {
            let outcome = task.handle.await.unwrap_or_else(|e| {
                tracing::error!("Chat task failed: {}", e);
                ChatOutcome::ConnectionLost
            });
            ChatExchange::settle(&mut self.session, &mut self.view, &task.pending, outcome);
        }

        if self.clear_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(handle) = self.clear_task.take() {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| ClearOutcome::Failed(format!("Error: {}", e)));
                self.apply_clear(outcome);
            }
        }
    }

    fn apply_clear(&mut self, outcome: ClearOutcome) {
        if let Some(next) = ChatExchange::finish_clear(&mut self.session, &outcome) {
            self.view.navigate(next);
            return;
        }
        match outcome {
            ClearOutcome::Cleared => self.view.alert(HISTORY_CLEARED),
            ClearOutcome::Failed(message) => self.view.alert(&message),
            ClearOutcome::Unauthorized => {}
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.view.conversation.has_pending() || self.auth_task.is_some() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
