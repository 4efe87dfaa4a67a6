//! v1 API endpoints

pub mod metrics;
pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::run_query))
        .route("/metrics/summary", get(metrics::get_summary))
}
