//! Text-generation collaborator for the numera bot.
//!
//! The collaborator is a black box behind the [`TextGenerator`] trait: prompt
//! in, text out, bounded by a timeout. The HTTP implementation (`client`)
//! talks to an OpenAI-compatible chat-completions API; handlers substitute a
//! deterministic local fallback whenever `generate` errors, so no failure
//! here ever reaches the end user.

pub mod client;
pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;

pub use client::HttpTextGenerator;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("text generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("text generation request failed: {0}")]
    Request(String),
    #[error("text generation returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("text generation response was malformed: {0}")]
    MalformedResponse(String),
}

/// System-prompt persona for a generation call. One per reply flow, plus the
/// default consultant voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptStyle {
    Default,
    Detailed,
    Compatibility,
    Forecast,
    Horoscope,
}

impl PromptStyle {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Default => {
                "You are a professional numerology consultant with twenty years of \
                 experience. Calculate numerological meanings and give practical \
                 recommendations. Write in a friendly, confident tone without mystical \
                 excess. Never mention that you are an AI."
            }
            Self::Detailed => {
                "You are an expert in numerology and personality psychology. Analyze \
                 birth dates and provide deep, personalized insights. Structure: key \
                 number, strengths, growth areas, practical advice. Be precise but \
                 inspiring."
            }
            Self::Compatibility => {
                "You are a relationship and compatibility specialist. Analyze pairs of \
                 birth dates and give recommendations for different areas of life. Be \
                 diplomatic and emphasize the couple's strengths."
            }
            Self::Forecast => {
                "You are an analyst of cycles and forecasts. Based on a birth date, \
                 produce forecasts for the requested period. Focus on opportunities and \
                 challenges, with practical recommendations."
            }
            Self::Horoscope => {
                "You are an astrologer-numerologist. Create inspiring, personalized \
                 horoscopes grounded in numbers, combining numerology with positive \
                 psychology. Be creative but realistic."
            }
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, style: PromptStyle) -> Result<String, OracleError>;
}

/// Stand-in generator that always errors; useful for wiring and for
/// exercising the fallback path in tests.
#[derive(Default)]
pub struct NoopTextGenerator;

#[async_trait]
impl TextGenerator for NoopTextGenerator {
    async fn generate(&self, _prompt: &str, _style: PromptStyle) -> Result<String, OracleError> {
        Err(OracleError::Request("no text generator configured".to_owned()))
    }
}
