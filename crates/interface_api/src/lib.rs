//! HTTP API Layer
//!
//! Thin axum surface over the policy lifecycle service. Handlers translate
//! DTOs, the service does the work, errors map onto consistent JSON bodies.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(lifecycle);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod dto;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_fulfillment::PolicyLifecycle;

use crate::handlers::{health, policy};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<PolicyLifecycle>,
}

/// Creates the main API router
pub fn create_router(lifecycle: Arc<PolicyLifecycle>) -> Router {
    let state = AppState { lifecycle };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let policy_routes = Router::new()
        .route("/purchase", post(policy::purchase))
        .route("/:id/state", get(policy::get_state))
        .route("/:id/history", get(policy::get_history))
        .route("/:id/retry", post(policy::retry_fulfillment))
        .route("/:id/refund", post(policy::initiate_refund));

    let api_routes = Router::new()
        .nest("/policies", policy_routes)
        .route("/quotes", post(policy::quote))
        .route("/payments/notifications", post(policy::payment_notification));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
