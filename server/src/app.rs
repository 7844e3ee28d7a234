use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{handlers, state::AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/coverpage", post(handlers::upload_coverpage))
        .route("/coverpage/test", get(handlers::test_media_host))
        .route("/health", get(handlers::health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .with_state(state)
}
