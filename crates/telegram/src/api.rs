//! Outbound Bot API surface. Handlers only ever need two calls: deliver a
//! message (optionally with a keyboard) and acknowledge an inline-button
//! press. The trait keeps handlers testable with a recording double.

use std::sync::Mutex;

use async_trait::async_trait;
use numera_core::config::TelegramConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::keyboards::ReplyMarkup;

#[derive(Debug, Error)]
pub enum BotApiError {
    #[error("bot api request failed: {0}")]
    Http(String),
    #[error("bot api rejected the call: {description}")]
    Rejected { description: String },
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<(), BotApiError>;

    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotApiError>;
}

pub struct HttpBotApi {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl HttpBotApi {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token.expose_secret())
    }

    async fn call<P: Serialize>(&self, method: &str, payload: &P) -> Result<(), BotApiError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|error| BotApiError::Http(error.to_string()))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|error| BotApiError::Http(error.to_string()))?;

        if !body.ok {
            let description =
                body.description.unwrap_or_else(|| format!("status {}", status.as_u16()));
            warn!(method, description = %description, "bot api call rejected");
            return Err(BotApiError::Rejected { description });
        }
        Ok(())
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<(), BotApiError> {
        self.call(
            "sendMessage",
            &SendMessagePayload { chat_id, text, reply_markup: markup },
        )
        .await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotApiError> {
        self.call("answerCallbackQuery", &AnswerCallbackPayload { callback_query_id: callback_id })
            .await
    }
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Serialize)]
struct AnswerCallbackPayload<'a> {
    callback_query_id: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// One delivered message, as captured by [`RecordingBotApi`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

/// In-memory double that records every outbound call; `failing` makes every
/// delivery attempt error.
#[derive(Default)]
pub struct RecordingBotApi {
    pub failing: bool,
    sent: Mutex<Vec<SentMessage>>,
    answered: Mutex<Vec<String>>,
}

impl RecordingBotApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().expect("answered lock").clone()
    }
}

#[async_trait]
impl BotApi for RecordingBotApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<(), BotApiError> {
        if self.failing {
            return Err(BotApiError::Http("recording api set to fail".to_owned()));
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push(SentMessage { chat_id, text: text.to_owned(), markup });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotApiError> {
        if self.failing {
            return Err(BotApiError::Http("recording api set to fail".to_owned()));
        }
        self.answered.lock().expect("answered lock").push(callback_id.to_owned());
        Ok(())
    }
}
