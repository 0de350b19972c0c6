use super::render_message::render_test_message;
use crate::config::Config;
use crate::http_client;
use crate::models::user::User;
use crate::models::user_settings::UserSettings;
use isahc::prelude::*;
use isahc::Request;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub msg: String,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl From<isahc::Error> for NotifyError {
    fn from(error: isahc::Error) -> Self {
        NotifyError {
            msg: format!("http error: {error}"),
        }
    }
}

impl From<isahc::http::Error> for NotifyError {
    fn from(error: isahc::http::Error) -> Self {
        NotifyError {
            msg: format!("request error: {error}"),
        }
    }
}

impl From<std::io::Error> for NotifyError {
    fn from(error: std::io::Error) -> Self {
        NotifyError {
            msg: format!("io error: {error}"),
        }
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(error: serde_json::Error) -> Self {
        NotifyError {
            msg: format!("json error: {error}"),
        }
    }
}

#[cfg_attr(test, automock)]
pub trait Notifier {
    fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct SendMessageParams<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api_url: String,
}

impl Default for TelegramNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramNotifier {
    pub fn new() -> Self {
        let token = Config::telegram_bot_token();
        let base_url = Config::telegram_base_url();

        TelegramNotifier {
            api_url: format!("{base_url}{token}"),
        }
    }
}

impl Notifier for TelegramNotifier {
    fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/sendMessage", self.api_url);
        let body = serde_json::to_string(&SendMessageParams { chat_id, text })?;

        let request = Request::post(url)
            .header("content-type", "application/json")
            .body(body)?;

        let mut response = http_client::client().send(request)?;
        let response_body = response.text()?;

        check_response(response.status().as_u16(), &response_body)
    }
}

fn check_response(status: u16, body: &str) -> Result<(), NotifyError> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(ApiResponse { ok: true, .. }) => Ok(()),
        Ok(ApiResponse { description, .. }) => Err(NotifyError {
            msg: format!(
                "telegram rejected the message: {}",
                description.unwrap_or_else(|| format!("status {status}"))
            ),
        }),
        Err(_) => Err(NotifyError {
            msg: format!("unexpected telegram response with status {status}"),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestMessageError {
    TelegramDisabled,
    MissingChat,
    Delivery(NotifyError),
}

impl fmt::Display for TestMessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TelegramDisabled => write!(f, "telegram notifications are disabled"),
            Self::MissingChat => write!(f, "no telegram chat id is configured"),
            Self::Delivery(error) => write!(f, "telegram delivery failed: {error}"),
        }
    }
}

/// Sends a test message to the chat alerts would go to. Returns that chat id.
pub fn send_test_message<N: Notifier>(
    notifier: &N,
    settings: &UserSettings,
    user: &User,
    fallback_chat_id: Option<&str>,
) -> Result<String, TestMessageError> {
    if !settings.telegram_enabled {
        return Err(TestMessageError::TelegramDisabled);
    }

    let chat_id = settings
        .telegram_chat(fallback_chat_id)
        .ok_or(TestMessageError::MissingChat)?;

    notifier
        .send_message(&chat_id, &render_test_message(user))
        .map_err(TestMessageError::Delivery)?;

    Ok(chat_id)
}
