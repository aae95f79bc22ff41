use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(handlers::download))
        .route("/video-info", post(handlers::video_info))
        .route("/download-audio", post(handlers::download_audio))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
