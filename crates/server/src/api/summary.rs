use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use offhours_queue::SummaryRunReport;

use crate::state::AppState;

/// Same run the scheduler performs, triggered on demand.
pub async fn run_summary_now(State(state): State<Arc<AppState>>) -> Json<SummaryRunReport> {
    tracing::info!("Summary run requested over HTTP");
    Json(state.summary_job.run(Utc::now()).await)
}
