use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/executors: registered executors and their action contracts.
pub async fn list_executors(State(app): State<AppState>) -> Json<serde_json::Value> {
    let executors: Vec<serde_json::Value> = app
        .orchestrator
        .dispatcher()
        .executors()
        .iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id(),
                "name": e.name(),
                "role": e.role(),
                "handles": e.handled_types(),
                "actions": e.registry().descriptors(),
            })
        })
        .collect();
    Json(serde_json::Value::Array(executors))
}
