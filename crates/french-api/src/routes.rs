//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS and tracing layers plus all
//! endpoint handlers. The surface is a thin pass-through to the
//! conversation pipeline and the stores.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use french_core::error::FrenchError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Open CORS: the service binds to localhost only and carries no
    // credentials, so any origin may call it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/chat/{channel}/history", get(handlers::history))
        .route("/tasks", get(handlers::list_tasks))
        .route("/zone", get(handlers::get_zone).post(handlers::set_zone))
        .route("/reset", delete(handlers::reset))
        .route("/logs", get(handlers::logs))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 127.0.0.1 (localhost only) on the port from config.
pub async fn start_server(port: u16, state: AppState) -> Result<(), FrenchError> {
    let addr = format!("127.0.0.1:{}", port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FrenchError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| FrenchError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
