use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = json!({
            "error": {
                "message": message,
                "code": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures inside the notification core. None of these ever reach the
/// request-serving path; they end the unit of work they occur in and are
/// logged.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Send to {address} failed: {reason}")]
    ChannelSendFailure { address: i64, reason: String },

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    #[error("Channel rejected credential: {0}")]
    ChannelRejected(String),

    /// The channel could not be reached or answered with a server error.
    /// Says nothing about whether the credential is valid.
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),
}

impl From<sqlx::Error> for NotifyError {
    fn from(e: sqlx::Error) -> Self {
        NotifyError::DataUnavailable(e.to_string())
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;
