//! Question answering endpoint

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{Json, QueryRequest};
use crate::domain::PipelineResult;

/// POST /v1/query
///
/// Always answers 200; pipeline failures are reported in the body.
pub async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<PipelineResult> {
    debug!(query_id = ?request.query_id, "Received query");

    let result = state
        .pipeline
        .run(&request.question, request.query_id)
        .await;

    Json(result)
}
