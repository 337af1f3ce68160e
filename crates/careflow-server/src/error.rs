use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use careflow_core::CareflowError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Every error renders as
/// `{"error": "<message>"}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CareflowError::InvalidRequest(msg.into()).into())
    }
}

fn status_for(e: &CareflowError) -> StatusCode {
    match e {
        CareflowError::InvalidRequest(_) | CareflowError::InvalidTaskType(_) => {
            StatusCode::BAD_REQUEST
        }
        CareflowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        CareflowError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CareflowError::DuplicateAction { .. }
        | CareflowError::DuplicateExecutor(_)
        | CareflowError::InvalidConfig(_)
        | CareflowError::Oracle(_)
        | CareflowError::Io(_)
        | CareflowError::Yaml(_)
        | CareflowError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<CareflowError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_maps_to_400() {
        let response = AppError::bad_request("message is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn session_not_found_maps_to_404() {
        let err = AppError(CareflowError::SessionNotFound("u1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_maps_to_422() {
        let err = AppError(
            CareflowError::InvalidTransition {
                from: "Completed".into(),
                to: "Failed".into(),
            }
            .into(),
        );
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unknown_errors_map_to_500() {
        let err = AppError(anyhow::anyhow!("something odd"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn config_errors_map_to_500() {
        let err = AppError(CareflowError::InvalidConfig("bad".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
