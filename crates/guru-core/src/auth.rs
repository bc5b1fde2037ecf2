//! Login and signup
//!
//! `submit` runs the whole flow. Front ends that must not block their event
//! loop call the three steps themselves: [`AuthFlow::begin`] on the UI
//! thread, [`AuthFlow::request`] on a background task, and
//! [`AuthFlow::finish`] back on the UI thread once the task settles.

use anyhow::Result;
use std::sync::Arc;

use crate::api::{ApiReply, AuthResponse, CredentialsRequest, Transport};
use crate::config::AuthMode;
use crate::session::Session;
use crate::view::{AuthView, Surface};

pub const BUSY_LABEL: &str = "Verifying...";
pub const MISSING_FIELDS: &str = "Please enter both a username and a password.";
pub const SIGNUP_SUCCESS: &str = "Account created! You can now log in.";
pub const AUTH_FALLBACK_ERROR: &str = "Authentication failed";
pub const CONNECTION_ERROR: &str = "GURU Server Connection Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Signup,
}

impl AuthKind {
    pub fn path(&self) -> &'static str {
        match self {
            AuthKind::Login => "login",
            AuthKind::Signup => "signup",
        }
    }

    /// Label of the submit control when no request is running
    pub fn idle_label(&self) -> &'static str {
        match self {
            AuthKind::Login => "Log In",
            AuthKind::Signup => "Register",
        }
    }

    pub fn surface(&self) -> Surface {
        match self {
            AuthKind::Login => Surface::Login,
            AuthKind::Signup => Surface::Signup,
        }
    }
}

/// Trimmed, non-empty form input
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(username: &str, password: &str) -> Option<Self> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A field was empty; nothing was sent
    Invalid,
    LoggedIn { display_name: String },
    SignedUp,
    /// The server refused; carries the message shown to the user
    Rejected(String),
    ConnectionError,
}

#[derive(Clone)]
pub struct AuthFlow {
    transport: Arc<dyn Transport>,
    auth_mode: AuthMode,
}

impl AuthFlow {
    /// `auth_mode` must match the transport's: bearer logins require a
    /// token, cookie logins never keep one.
    pub fn new(transport: Arc<dyn Transport>, auth_mode: AuthMode) -> Self {
        Self {
            transport,
            auth_mode,
        }
    }

    pub async fn submit<V: AuthView + ?Sized>(
        &self,
        session: &mut Session,
        view: &mut V,
        kind: AuthKind,
        username: &str,
        password: &str,
    ) -> AuthOutcome {
        let Some(credentials) = Self::begin(view, kind, username, password) else {
            return AuthOutcome::Invalid;
        };
        let result = self.request(kind, &credentials).await;
        self.finish(session, view, kind, &credentials, result)
    }

    /// Validate the form and disable the submit control. `None` means the
    /// form was rejected and no request should be made.
    pub fn begin<V: AuthView + ?Sized>(
        view: &mut V,
        kind: AuthKind,
        username: &str,
        password: &str,
    ) -> Option<Credentials> {
        let Some(credentials) = Credentials::parse(username, password) else {
            view.inline_error(MISSING_FIELDS);
            return None;
        };

        tracing::info!("Submitting {} for {}", kind.path(), credentials.username);
        view.set_submit_state(BUSY_LABEL, false);
        Some(credentials)
    }

    pub async fn request(&self, kind: AuthKind, credentials: &Credentials) -> Result<ApiReply> {
        let body = serde_json::to_value(CredentialsRequest {
            username: &credentials.username,
            password: &credentials.password,
        })?;
        self.transport.post_json(kind.path(), body, None).await
    }

    /// Restore the submit control, then apply the result. The control is
    /// re-enabled on every path, before any navigation.
    pub fn finish<V: AuthView + ?Sized>(
        &self,
        session: &mut Session,
        view: &mut V,
        kind: AuthKind,
        credentials: &Credentials,
        result: Result<ApiReply>,
    ) -> AuthOutcome {
        view.set_submit_state(kind.idle_label(), true);
        self.apply(session, view, kind, credentials, result)
    }

    fn apply<V: AuthView + ?Sized>(
        &self,
        session: &mut Session,
        view: &mut V,
        kind: AuthKind,
        credentials: &Credentials,
        result: Result<ApiReply>,
    ) -> AuthOutcome {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("{} request failed: {}", kind.path(), e);
                view.alert(CONNECTION_ERROR);
                return AuthOutcome::ConnectionError;
            }
        };

        let response: AuthResponse = reply.decode();

        if !reply.is_success() {
            let message = response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| AUTH_FALLBACK_ERROR.to_string());
            tracing::warn!("{} rejected ({}): {}", kind.path(), reply.status, message);
            view.alert(&message);
            return AuthOutcome::Rejected(message);
        }

        match kind {
            AuthKind::Login => {
                let display_name = response
                    .username
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| credentials.username.clone());
                // The cookie jar does not outlive the process, so a stored
                // token would reopen chat without a valid session
                let token = match self.auth_mode {
                    AuthMode::Bearer => {
                        match response.token.filter(|t| !t.trim().is_empty()) {
                            Some(token) => Some(token),
                            None => {
                                tracing::warn!("Login succeeded without a token");
                                view.alert(AUTH_FALLBACK_ERROR);
                                return AuthOutcome::Rejected(AUTH_FALLBACK_ERROR.to_string());
                            }
                        }
                    }
                    AuthMode::Cookie => None,
                };
                if let Err(e) = session.set_credential(token.as_deref(), &display_name) {
                    tracing::warn!("Failed to persist session: {}", e);
                }
                view.navigate(Surface::Chat);
                AuthOutcome::LoggedIn { display_name }
            }
            AuthKind::Signup => {
                view.alert(SIGNUP_SUCCESS);
                view.navigate(Surface::Login);
                AuthOutcome::SignedUp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAuthView, FakeTransport};
    use serde_json::json;

    fn build(transport: FakeTransport) -> (AuthFlow, Arc<FakeTransport>) {
        build_with(AuthMode::Bearer, transport)
    }

    fn build_with(mode: AuthMode, transport: FakeTransport) -> (AuthFlow, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        (AuthFlow::new(transport.clone(), mode), transport)
    }

    #[tokio::test]
    async fn test_login_success_stores_credential() {
        let (flow, transport) = build(
            FakeTransport::new().reply(200, json!({"token": "jwt-1", "username": "asha"})),
        );
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Login, " asha ", "secret")
            .await;

        assert_eq!(outcome, AuthOutcome::LoggedIn { display_name: "asha".to_string() });
        assert_eq!(session.token(), Some("jwt-1"));
        assert_eq!(session.display_name(), "asha");
        assert_eq!(view.navigations, vec![Surface::Chat]);
        assert!(view.alerts.is_empty());

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "login");
        assert_eq!(calls[0].body, json!({"username": "asha", "password": "secret"}));
        assert_eq!(calls[0].token, None);
    }

    #[tokio::test]
    async fn test_login_success_for_many_inputs() {
        for (username, password) in [("a", "b"), ("  kiran", "pw  "), ("संजय", "पासवर्ड")] {
            let (flow, _) = build(FakeTransport::new().reply(200, json!({"token": "t"})));
            let mut session = Session::ephemeral();
            let mut view = FakeAuthView::new();

            flow.submit(&mut session, &mut view, AuthKind::Login, username, password)
                .await;

            assert_eq!(session.token(), Some("t"));
            assert_eq!(session.display_name(), username.trim());
            assert_eq!(view.navigations.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_busy_state_and_restore() {
        let (flow, _) = build(FakeTransport::new().reply(200, json!({"token": "t"})));
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        flow.submit(&mut session, &mut view, AuthKind::Login, "u", "p")
            .await;

        assert_eq!(
            view.submit_history,
            vec![(BUSY_LABEL.to_string(), false), ("Log In".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_empty_fields_make_no_request() {
        let (flow, transport) = build(FakeTransport::new());
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Login, "   ", "pw")
            .await;

        assert_eq!(outcome, AuthOutcome::Invalid);
        assert!(transport.calls().is_empty());
        assert_eq!(view.inline_errors, vec![MISSING_FIELDS.to_string()]);
        assert!(view.submit_history.is_empty());
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_signup_success_returns_to_login() {
        let (flow, transport) =
            build(FakeTransport::new().reply(201, json!({"message": "User created"})));
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Signup, "new", "pw")
            .await;

        assert_eq!(outcome, AuthOutcome::SignedUp);
        assert_eq!(transport.calls()[0].path, "signup");
        assert_eq!(view.alerts, vec![SIGNUP_SUCCESS.to_string()]);
        assert_eq!(view.navigations, vec![Surface::Login]);
        assert_eq!(session.token(), None);
        assert_eq!(view.submit_label, "Register");
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_rejection_shows_server_error() {
        let (flow, _) = build(FakeTransport::new().reply(401, json!({"error": "Invalid credentials"})));
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Login, "u", "bad")
            .await;

        assert_eq!(outcome, AuthOutcome::Rejected("Invalid credentials".to_string()));
        assert_eq!(view.alerts, vec!["Invalid credentials".to_string()]);
        assert!(view.navigations.is_empty());
        assert_eq!(session.token(), None);
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_rejection_without_detail_uses_fallback() {
        let (flow, _) = build(FakeTransport::new().reply(500, serde_json::Value::Null));
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        flow.submit(&mut session, &mut view, AuthKind::Signup, "u", "p")
            .await;

        assert_eq!(view.alerts, vec![AUTH_FALLBACK_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn test_connection_error_restores_control() {
        let (flow, _) = build(FakeTransport::new().fail());
        let mut session = Session::ephemeral();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Login, "u", "p")
            .await;

        assert_eq!(outcome, AuthOutcome::ConnectionError);
        assert_eq!(view.alerts, vec![CONNECTION_ERROR.to_string()]);
        assert_eq!(view.submit_label, "Log In");
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_bearer_login_without_token_is_rejected() {
        for body in [serde_json::Value::Null, json!({}), json!({"token": "", "username": "u"})] {
            let (flow, _) = build(FakeTransport::new().reply(200, body));
            let mut session = Session::ephemeral();
            let mut view = FakeAuthView::new();

            let outcome = flow
                .submit(&mut session, &mut view, AuthKind::Login, "u", "p")
                .await;

            assert_eq!(outcome, AuthOutcome::Rejected(AUTH_FALLBACK_ERROR.to_string()));
            assert_eq!(view.alerts, vec![AUTH_FALLBACK_ERROR.to_string()]);
            assert!(view.navigations.is_empty());
            assert_eq!(session.token(), None);
            assert_eq!(session.initial_surface(), Surface::Login);
            assert!(view.submit_enabled);
        }
    }

    #[tokio::test]
    async fn test_cookie_login_does_not_keep_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let (flow, _) = build_with(
            AuthMode::Cookie,
            FakeTransport::new().reply(200, json!({"token": "jwt-9", "username": "cookie-user"})),
        );
        let mut session = Session::load(&path).unwrap();
        let mut view = FakeAuthView::new();

        let outcome = flow
            .submit(&mut session, &mut view, AuthKind::Login, "cookie-user", "p")
            .await;

        assert_eq!(outcome, AuthOutcome::LoggedIn { display_name: "cookie-user".to_string() });
        assert_eq!(session.token(), None);
        assert_eq!(session.display_name(), "cookie-user");
        assert_eq!(view.navigations, vec![Surface::Chat]);

        // Next launch has an empty cookie jar and must start at login
        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.token(), None);
        assert_eq!(reloaded.initial_surface(), Surface::Login);
    }
}
