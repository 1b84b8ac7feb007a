use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use yoochat_social::SocialError;
use yoochat_types::api::MessageBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No token provided")]
    Unauthorized,

    /// Gateway handshakes answer a bad token with 401 rather than 403.
    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::Invalid(m) => Self::BadRequest(m),
            SocialError::Forbidden(m) => Self::Forbidden(m),
            SocialError::NotFound(m) => Self::NotFound(m),
            SocialError::Internal(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            Self::Internal(e) => {
                error!("Request failed: {:#}", e);
                "Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(MessageBody::new(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
