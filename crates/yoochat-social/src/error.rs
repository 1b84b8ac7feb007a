use thiserror::Error;

/// Outcome of a rejected operation. The message is shown to the client
/// as-is for every variant except `Internal`.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SocialError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Text safe to hand back to a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type SocialResult<T> = Result<T, SocialError>;
