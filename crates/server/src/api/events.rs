//! Inbound chat events delivered by the platform relay.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use offhours_core::{CommandEvent, MessageEvent};
use offhours_queue::{CommandReply, IngestOutcome, QueueError};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// Run one message through the mention pipeline.
///
/// Store failures surface as 502 so the relay can retry; nothing was
/// replied in that case.
pub async fn message_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MessageEvent>,
) -> Result<Json<IngestOutcome>, (StatusCode, Json<ErrorResponse>)> {
    match state.pipeline.handle(&event).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ QueueError::Store(_)) => {
            tracing::error!(author = %event.author_name, error = %e, "Mention not queued");
            Err(error_response(StatusCode::BAD_GATEWAY, e))
        }
        Err(e) => {
            tracing::error!(author = %event.author_name, error = %e, "Mention handling failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// Execute an admin command; the body is the acknowledgement to show.
pub async fn command(
    State(state): State<Arc<AppState>>,
    Json(event): Json<CommandEvent>,
) -> Json<CommandReply> {
    Json(state.admin.execute(&event, Utc::now()).await)
}
