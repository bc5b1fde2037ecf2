//! UI-agnostic view capabilities
//!
//! The flows in this crate never touch a concrete renderer. A front end
//! (the TUI, a webview, a test double) implements these traits and hands
//! itself to [`crate::AuthFlow`] and [`crate::ChatExchange`].

use crate::conversation::Conversation;

/// The screens a client can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Login,
    Signup,
    Chat,
}

/// Can move the user to another surface
pub trait Navigator {
    fn navigate(&mut self, surface: Surface);
}

/// Capabilities the login and signup forms expose to the auth flow
pub trait AuthView: Navigator {
    /// Set the submit control's label and whether it accepts input
    fn set_submit_state(&mut self, label: &str, enabled: bool);

    /// Show a blocking notice to the user
    fn alert(&mut self, message: &str);

    /// Feedback shown next to the form fields, without a request being made
    fn inline_error(&mut self, message: &str);
}

/// Capabilities the chat surface exposes to the chat exchange
pub trait ChatView: Navigator {
    fn input_text(&self) -> String;
    fn clear_input(&mut self);
    fn conversation(&mut self) -> &mut Conversation;
}
