use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{AuthMode, Config};

#[derive(Serialize)]
pub struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Deserialize, Default)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub username: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ChatResponse {
    pub reply: Option<String>,
    pub error: Option<String>,
}

/// Status code and JSON body of a backend response.
///
/// Bodies that are not JSON are kept as `Value::Null`; callers classify by
/// status first.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body, treating anything unexpected as an empty object
    pub fn decode<T: DeserializeOwned + Default>(&self) -> T {
        serde_json::from_value(self.body.clone()).unwrap_or_default()
    }
}

/// The backend HTTP contract. An `Err` means the request never produced a
/// response (connection refused, DNS, TLS, timeout).
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body to `path` (relative to the API base). `token` is the
    /// caller's credential; whether it is sent depends on the transport.
    async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Result<ApiReply>;
}

/// reqwest-backed transport for the real backend
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_mode: AuthMode,
}

impl HttpTransport {
    pub fn new(base_url: &str, auth_mode: AuthMode) -> Result<Self> {
        // Cookie mode keeps the login cookie in the client's jar and never
        // sends the bearer header
        let client = Client::builder()
            .cookie_store(auth_mode == AuthMode::Cookie)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_mode,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url(), config.auth_mode())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Result<ApiReply> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self.client.post(&url).json(&body);
        if let (AuthMode::Bearer, Some(token)) = (self.auth_mode, token) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        tracing::debug!("POST {} -> {}", url, status);
        Ok(ApiReply::new(status, body))
    }
}
