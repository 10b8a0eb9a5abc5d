use thiserror::Error;

/// Failures surfaced by the ingress gateway before any work is scheduled.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("webhook secret did not match")]
    AuthenticationFailed,
    #[error("inbound payload was not a valid update: {0}")]
    MalformedPayload(String),
}

/// Failures inside a scheduled reply flow. None of these reach the end user
/// as an error; handlers substitute deterministic fallback text instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("text generation timed out after {timeout_secs}s")]
    UpstreamTimeout { timeout_secs: u64 },
    #[error("text generation failed: {0}")]
    Upstream(String),
    #[error("reply delivery failed: {0}")]
    Delivery(String),
}

impl FlowError {
    /// Whether the flow can still answer the user from a local fallback.
    /// Only delivery failures leave the user without a reply.
    pub fn recoverable(&self) -> bool {
        !matches!(self, Self::Delivery(_))
    }
}
