pub mod admin;
pub mod api;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use admin::*;
pub use api::*;
pub use health::*;
pub use metrics::*;
pub use middleware::*;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;

use crate::observability::{observability_middleware, Metrics};
use crate::services::FoodService;

/// Build the full application router
pub fn create_app(
    metrics: Arc<Metrics>,
    food_service: Arc<FoodService>,
    admin_state: AdminState,
    max_request_size: u64,
) -> Router {
    let metrics_for_middleware = metrics.clone();

    Router::new()
        // Health and metrics endpoints (with metrics state)
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .merge(create_api_router(food_service))
        .merge(create_admin_router(admin_state))
        // Add middleware layers (order matters - outer to inner)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(cors_middleware))
        .layer(axum_middleware::from_fn_with_state(
            max_request_size,
            request_validation_middleware,
        ))
        .layer(axum_middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
