pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use careflow_core::Orchestrator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(orchestrator: Orchestrator) -> Router {
    let app_state = state::AppState::new(orchestrator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Chat
        .route("/api/chat", post(routes::chat::chat))
        // Sessions
        .route(
            "/api/reset_session/{user_id}",
            post(routes::sessions::reset_session),
        )
        .route(
            "/api/sessions/{user_id}",
            get(routes::sessions::get_session),
        )
        // Directory
        .route("/api/departments", get(routes::directory::list_departments))
        .route(
            "/api/departments/match",
            post(routes::directory::match_departments),
        )
        .route("/api/doctors", get(routes::directory::list_doctors))
        .route("/api/symptoms", get(routes::directory::list_symptoms))
        // Introspection
        .route("/api/health", get(routes::health::health))
        .route("/api/executors", get(routes::executors::list_executors))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the chat server on `0.0.0.0:{port}`.
pub async fn serve(orchestrator: Orchestrator, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(orchestrator, listener).await
}

/// Start the chat server on a pre-bound listener.
///
/// Lets the caller read the actual port first (useful with port 0).
pub async fn serve_on(
    orchestrator: Orchestrator,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(orchestrator);

    tracing::info!("careflow server listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
