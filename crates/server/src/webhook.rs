//! The ingress gateway. One webhook route guarded by the shared secret
//! header, plus the health and stats read-only endpoints. The webhook
//! responds fast and never exposes processing problems to the caller: only
//! a bad secret earns an error status; a malformed body is acknowledged and
//! dropped so the platform does not endlessly redeliver it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use numera_core::errors::GatewayError;
use numera_store::{FlowCounts, StateStore};
use numera_telegram::{EventProcessor, InboundEvent};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, MetricsSnapshot};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct GatewayState {
    secret: SecretString,
    dispatcher: Dispatcher,
    processor: Arc<EventProcessor>,
    store: Arc<StateStore>,
}

impl GatewayState {
    pub fn new(
        secret: SecretString,
        dispatcher: Dispatcher,
        processor: Arc<EventProcessor>,
        store: Arc<StateStore>,
    ) -> Self {
        Self { secret, dispatcher, processor, store }
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .with_state(state)
}

async fn webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let provided = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
    if provided != Some(state.secret.expose_secret()) {
        warn!(error = %GatewayError::AuthenticationFailed, "rejecting webhook call");
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "status": "unauthorized" })));
    }

    let ack = (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })));

    let payload = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => payload,
        Err(error) => {
            let error = GatewayError::MalformedPayload(error.to_string());
            info!(error = %error, "acknowledging unreadable webhook body");
            return ack;
        }
    };

    match InboundEvent::parse(payload) {
        Ok(event) => {
            let processor = state.processor.clone();
            if let Err(error) = state.dispatcher.submit(async move { processor.process(event).await })
            {
                // The update is lost; the platform gets an ack either way so
                // it does not hammer a saturated bot with redeliveries.
                warn!(error = %error, "dropping update");
            }
        }
        Err(error) => {
            info!(error = %error, "acknowledging malformed update");
        }
    }

    ack
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    checked_at: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        service: "numera-server",
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    users: usize,
    lifetime: FlowCounts,
    today: FlowCounts,
    dispatch: MetricsSnapshot,
}

async fn stats(State(state): State<GatewayState>) -> Json<StatsResponse> {
    let counters = state.store.counters().await;
    Json(StatsResponse {
        users: state.store.user_count().await,
        today: counters.day(Utc::now().date_naive()),
        lifetime: counters.lifetime,
        dispatch: state.dispatcher.metrics(),
    })
}
