//! HTTP front end for the mNAV tracker.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use mnav_tracker::TrackerService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Full application router with tracing and permissive CORS.
pub fn app(service: Arc<TrackerService>) -> Router {
    routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}
