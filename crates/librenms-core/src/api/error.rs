use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - check LIBRENMS_TOKEN")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited by LibreNMS")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid LibreNMS URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Token cannot be sent as an HTTP header")]
    InvalidToken,
}

/// Longest LibreNMS response body kept in an error message
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Cut `body` at a char boundary near the limit, noting its full size
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a failed LibreNMS response by status code.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError {
                status,
                body: truncated,
            },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::ServerError { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
