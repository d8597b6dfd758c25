use thiserror::Error;

/// Failure talking to the console backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not logged in, or the token has expired")]
    Unauthorized,

    #[error("Missing permission: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by the server")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Could not reach the server: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Error bodies longer than this are cut before they reach messages or logs
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
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

    /// Map a non-success status and its body to an error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(body),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(body),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, body)),
        }
    }

    /// Whether the failure means the credentials or token were refused.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::AccessDenied(_))
    }

    /// Walk an error chain for an auth failure.
    pub fn is_auth_failure_in(error: &anyhow::Error) -> bool {
        error
            .chain()
            .filter_map(|e| e.downcast_ref::<ApiError>())
            .any(ApiError::is_auth_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, "no"), ApiError::AccessDenied(ref b) if b == "no"));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, "weak"), ApiError::BadRequest(ref b) if b == "weak"));
        assert!(matches!(ApiError::from_status(StatusCode::CONFLICT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(600);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::ServerError(msg) => {
                assert!(msg.starts_with(&"x".repeat(500)));
                assert!(msg.ends_with("(truncated, 600 total bytes)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_auth_failure_classification() {
        assert!(ApiError::Unauthorized.is_auth_failure());
        assert!(ApiError::AccessDenied(String::new()).is_auth_failure());
        assert!(!ApiError::RateLimited.is_auth_failure());
    }

    #[test]
    fn test_auth_failure_through_context() {
        let err = anyhow::Error::from(ApiError::Unauthorized).context("Failed to load user");
        assert!(ApiError::is_auth_failure_in(&err));

        let err = anyhow::Error::from(ApiError::RateLimited).context("Failed to load user");
        assert!(!ApiError::is_auth_failure_in(&err));
        assert!(!ApiError::is_auth_failure_in(&anyhow::anyhow!("plain")));
    }
}
