pub mod appointments;
pub mod health;
pub mod reviews;

use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full HTTP surface: scheduling proxy, review pipeline, health check.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")]);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/appointments",
            get(appointments::appointments).post(appointments::appointments),
        )
        .route(
            "/api/reviews",
            get(reviews::approved_reviews).post(reviews::submit_review),
        )
        .route(
            "/api/reviews/moderation",
            get(reviews::list_for_moderation).post(reviews::moderate),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
