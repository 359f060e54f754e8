use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, ingest, signer};
use crate::state::AppState;
use std::sync::Arc;

/// Create the application router
///
/// Anything not matched here falls through to the URL signer, which routes by
/// path suffix and answers unknown paths with a JSON 404.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get(api::health_check).fallback(signer::signer_handler),
        )
        .route(
            "/events/s3",
            post(ingest::s3_event_handler).fallback(signer::signer_handler),
        )
        .fallback(signer::signer_handler)
        .layer(TraceLayer::new_for_http())
}

/// Router with state applied, ready to serve.
pub fn create_app(state: Arc<AppState>) -> Router {
    create_api_router().with_state(state)
}
