//! Error types for API operations.

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::StoreError;

/// Maximum length of a response body echoed into an error message.
/// Server error pages can be huge; anything past this adds noise, not
/// information.
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The login endpoint rejected the username/password pair.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The registration endpoint rejected the submission. The message
    /// carries the server's explanation when it sent one.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// No usable session: the request needs a valid access token and
    /// none could be produced.
    #[error("not authorized - log in first")]
    NotAuthorized,

    /// The request never completed: DNS, connect, TLS, or timeout.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The server answered, but not with the shape we expected.
    #[error("unexpected response from server: {0}")]
    InvalidResponse(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Storage(#[from] StoreError),

    /// The server answered with a non-success status the client has no
    /// specific handling for.
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },
}

impl ApiError {
    /// Map a non-success response to an error. 401 means the session is
    /// not usable; everything else is reported with its status and a
    /// truncated body.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            ApiError::NotAuthorized
        } else {
            ApiError::RequestFailed {
                status,
                body: truncate_body(body),
            }
        }
    }

    pub(crate) fn registration_failed(body: &str) -> Self {
        ApiError::RegistrationFailed(truncate_body(body))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

/// Truncate by characters, not bytes, so a multi-byte body cannot
/// split mid-character.
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let prefix: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", prefix)
    }
}
