//! Liveness and health endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Plain-text liveness for uptime pingers.
pub async fn liveness() -> &'static str {
    "Bot is running!"
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub people: usize,
    pub store: String,
    pub sink: String,
    /// Queueing switch per person key.
    pub queueing: BTreeMap<String, bool>,
    pub reply_latch_entries: usize,
    pub config: serde_json::Value,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
        people: state.roster.len(),
        store: state.store.backend_name().to_string(),
        sink: state.sink.sink_name().to_string(),
        queueing: state.toggles.snapshot().await,
        reply_latch_entries: state.latch.len().await,
        config: state.config.redacted_summary(),
    })
}
