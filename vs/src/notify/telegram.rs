//! Telegram Bot API client

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default Bot API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Telegram API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("Cannot read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telegram token not found. Set the {0} environment variable.")]
    MissingToken(String),
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    description: Option<String>,
}

/// Minimal client for the `sendMessage` and `sendPhoto` methods
pub struct TelegramClient {
    token: String,
    chat_id: String,
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the token is a credential
        f.debug_struct("TelegramClient")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let chat_id = chat_id.into();
        let base_url = base_url.into();
        debug!(%chat_id, %base_url, ?timeout, "TelegramClient::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            token: token.into(),
            chat_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Read the bot token from the named environment variable
    pub fn from_env(
        token_env: &str,
        chat_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let token = std::env::var(token_env).map_err(|_| NotifyError::MissingToken(token_env.to_string()))?;
        Self::new(token, chat_id, base_url, timeout)
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Send a Markdown-formatted text message
    pub fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        debug!(chat_id = %self.chat_id, len = text.len(), "TelegramClient::send_message: called");
        let response = self
            .http
            .get(self.method_url("sendMessage"))
            .query(&[
                ("chat_id", self.chat_id.as_str()),
                ("parse_mode", "Markdown"),
                ("disable_web_page_preview", "true"),
                ("text", text),
            ])
            .send()?;
        check(response)
    }

    /// Upload a local image with an optional Markdown caption
    pub fn send_photo(&self, photo: &Path, caption: Option<&str>) -> Result<(), NotifyError> {
        debug!(chat_id = %self.chat_id, ?photo, "TelegramClient::send_photo: called");
        let mut form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("parse_mode", "Markdown");
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        let form = form.file("photo", photo)?;

        let response = self.http.post(self.method_url("sendPhoto")).multipart(form).send()?;
        check(response)
    }
}

fn check(response: Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let description = response
        .json::<ApiReply>()
        .ok()
        .and_then(|reply| reply.description)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    Err(NotifyError::Api {
        status: status.as_u16(),
        description,
    })
}
