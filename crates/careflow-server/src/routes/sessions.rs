use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/reset_session/{user_id}: drop the user's history and executor
/// memory. Resetting an unknown user is not an error.
pub async fn reset_session(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    let existed = app.orchestrator.reset_session(&user_id);
    let message = if existed {
        format!("session for {user_id} has been reset")
    } else {
        format!("no session for {user_id}; nothing to reset")
    };
    Json(serde_json::json!({
        "status": "success",
        "message": message,
    }))
}

/// GET /api/sessions/{user_id}: the user's bounded history.
pub async fn get_session(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = app.orchestrator.history(&user_id)?;
    Ok(Json(serde_json::to_value(&session)?))
}
