//! HTTP surface over the cost estimator.

pub mod estimate;
pub mod headers;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::estimator::CostEstimator;
use crate::metrics::AppMetrics;

/// Shared state for every route.
#[derive(Clone)]
pub struct ApiState {
    pub estimator: CostEstimator,
    pub metrics: Arc<AppMetrics>,
}

/// Assemble the full application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .route("/estimate", get(estimate::get_estimate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
