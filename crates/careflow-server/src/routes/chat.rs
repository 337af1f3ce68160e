use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub user_id: String,
    pub timestamp: String,
}

/// POST /api/chat: run one conversation turn for `user_id`.
pub async fn chat(
    State(app): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;

    let user_id = body
        .user_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("user_id is required"))?;
    let message = body
        .message
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("message is required"))?;

    let reply = app.orchestrator.chat(&user_id, &message).await?;
    Ok(Json(ChatResponse {
        response: reply.response,
        user_id: reply.user_id,
        timestamp: reply.timestamp,
    }))
}
