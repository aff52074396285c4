use reqwest::StatusCode;

use birdia_capture::CaptureError;
use birdia_common::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Login rejected.  The stored session is left as it was.
    #[error("incorrect email or password")]
    InvalidCredentials,
    /// The backend answered 401; the stored session has been cleared.
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("cannot reach the API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}
