use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(_) | CoreError::OutOfRange { .. } => {
                AppError::ValidationError(err.to_string())
            }
            CoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CoreError::Conflict(_) => AppError::ConflictError(err.to_string()),
            CoreError::StoreError(_) | CoreError::QueueClosed | CoreError::InternalError(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_status_codes() {
        assert_eq!(status_of(CoreError::OutOfRange { index: 5, total: 4 }), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CoreError::ValidationError("title".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CoreError::NotFound("event".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CoreError::Conflict("booked".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(CoreError::QueueClosed), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(CoreError::StoreError("down".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
