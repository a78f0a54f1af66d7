//! API route definitions

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::{handlers, state::AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found. Available routes: GET /, POST /upload, POST /train, POST /predict" })),
    )
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        Some(origin) if origin != "*" => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin = %origin, "Invalid CORS_ORIGIN, allowing any origin");
                layer.allow_origin(Any)
            }
        },
        _ => layer.allow_origin(Any),
    }
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let body_limit = state.config.max_upload_size;

    Router::new()
        .route("/", get(handlers::root))
        .route("/upload", post(handlers::upload_csv))
        .route("/train", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .fallback(handle_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
