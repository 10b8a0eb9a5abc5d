use std::time::Duration;

use async_trait::async_trait;
use numera_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{OracleError, PromptStyle, TextGenerator};

const TEMPERATURE: f32 = 0.6;

/// OpenAI-compatible chat-completions client. The whole request, connect
/// included, is bounded by the configured timeout.
pub struct HttpTextGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout_secs: u64,
    max_tokens: u32,
}

impl HttpTextGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_tokens: config.max_tokens,
        }
    }

    async fn request(&self, prompt: &str, style: PromptStyle) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: style.system_prompt().to_owned() },
                ChatMessage { role: "user", content: prompt.to_owned() },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| OracleError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "text generation returned an error status");
            return Err(OracleError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| OracleError::MalformedResponse(error.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| OracleError::MalformedResponse("response carried no choices".to_owned()))
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, style: PromptStyle) -> Result<String, OracleError> {
        let deadline = Duration::from_secs(self.timeout_secs);
        match tokio::time::timeout(deadline, self.request(prompt, style)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout { timeout_secs: self.timeout_secs }),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use numera_core::config::LlmConfig;

    use super::HttpTextGenerator;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = LlmConfig {
            api_key: "gsk-test".to_string().into(),
            base_url: "https://api.example.com/v1/".to_string(),
            model: "test-model".to_string(),
            timeout_secs: 5,
            max_tokens: 100,
        };

        let generator = HttpTextGenerator::new(&config);
        assert_eq!(generator.base_url, "https://api.example.com/v1");
    }
}
