use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session expired")]
    SessionExpired,

    #[error("Not logged in")]
    NoSession,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid month {0:?}, expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error body shape produced by the API (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// Human-readable message for a failed response.
    /// Uses the body's `detail` when it parses, otherwise a generic status message.
    pub fn detail_message(status: StatusCode, body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if !parsed.detail.trim().is_empty() => parsed.detail,
            _ => format!("API error: {}", status.as_u16()),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::SessionExpired,
            code => ApiError::Http {
                status: code,
                message: Self::detail_message(status, body),
            },
        }
    }

    /// True for failures the user can clear by trying again.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_used_as_message() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail": "X"}"#);
        assert_eq!(err.to_string(), "X");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_unparseable_body_falls_back() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "API error: 502");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error": "nope"}"#);
        assert_eq!(err.to_string(), "API error: 404");
    }

    #[test]
    fn test_unauthorized_is_session_expired() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail": "Invalid token"}"#);
        assert!(matches!(err, ApiError::SessionExpired));
    }

    #[test]
    fn test_is_transient() {
        assert!(ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(!ApiError::from_status(StatusCode::FORBIDDEN, "").is_transient());
        assert!(!ApiError::SessionExpired.is_transient());
    }
}
