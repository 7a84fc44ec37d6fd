use std::sync::Arc;

use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::agent::ConversationDriver;

use super::handlers;

/// State shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<ConversationDriver>,
}

pub fn build(state: AppState) -> Router {
    Router::new()
        // UI
        .route("/", get(serve_index))
        // Generation
        .route("/generate", post(handlers::generate))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("ui/index.html"))
}
