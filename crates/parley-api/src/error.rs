use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(core) => match core {
                CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::AlreadyMember => StatusCode::CONFLICT,
                CoreError::InvalidCode | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::AuthRequired | ApiError::BadCredentials => StatusCode::UNAUTHORIZED,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Core(CoreError::Store(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{:#}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (ApiError::from(CoreError::Unauthorized), StatusCode::UNAUTHORIZED),
            (ApiError::from(CoreError::NotFound("channel")), StatusCode::NOT_FOUND),
            (ApiError::from(CoreError::AlreadyMember), StatusCode::CONFLICT),
            (ApiError::from(CoreError::InvalidCode), StatusCode::BAD_REQUEST),
            (
                ApiError::from(CoreError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
