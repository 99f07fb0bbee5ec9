use thiserror::Error;

/// Transport-level error taxonomy for the platform REST API.
///
/// Produced in exactly one place (`shared-api`) so every cell sees the same
/// mapping from HTTP status codes to error categories.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps a non-success HTTP status to the matching category.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ApiError::Authorization(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            400 | 422 => ApiError::Validation(message),
            _ => ApiError::Api { status, message },
        }
    }
}
