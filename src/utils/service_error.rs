// Notifier error type shared by the stores, the scheduler and the HTTP surface
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Task {task_id} cannot be processed: {reason}")]
    InvalidTask { task_id: Uuid, reason: String },

    #[error("Owner {user_id} of task {task_id} not found")]
    OwnerNotFound { task_id: Uuid, user_id: Uuid },

    #[error("A due-date scan is already in progress")]
    ScanInProgress,

    #[error("Endpoint disabled")]
    Disabled,
}

impl IntoResponse for NotifierError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            NotifierError::Database(_) | NotifierError::Pool(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage unavailable".to_string(),
            ),
            NotifierError::InvalidTask { .. } | NotifierError::OwnerNotFound { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            },
            NotifierError::ScanInProgress => (StatusCode::CONFLICT, self.to_string()),
            NotifierError::Disabled => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<diesel::result::Error> for NotifierError {
    fn from(error: diesel::result::Error) -> Self {
        NotifierError::Database(error.to_string())
    }
}

impl From<bb8::RunError<diesel_async::pooled_connection::PoolError>> for NotifierError {
    fn from(error: bb8::RunError<diesel_async::pooled_connection::PoolError>) -> Self {
        NotifierError::Pool(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            NotifierError::ScanInProgress.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            NotifierError::Disabled.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NotifierError::Database("boom".to_string())
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_diesel_error_conversion() {
        let err: NotifierError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, NotifierError::Database(_)));
    }
}
