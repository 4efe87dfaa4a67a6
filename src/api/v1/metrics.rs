//! Query metrics endpoints

use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::AggregateMetrics;

/// GET /v1/metrics/summary
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<AggregateMetrics>, ApiError> {
    let aggregate = state.collector.aggregate().map_err(ApiError::from)?;

    Ok(Json(aggregate))
}
