use axum::extract::State;
use axum::Json;
use careflow_core::orchestrator::TIMESTAMP_FORMAT;

use crate::state::AppState;

/// GET /api/health
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let executors = app.orchestrator.dispatcher().executors().len();
    Json(serde_json::json!({
        "status": "ok",
        "time": chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        "executors": executors,
    }))
}
