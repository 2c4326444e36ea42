// Error taxonomy shared by the client application and the serverless
// functions. Codes are stable strings exposed on the wire; messages are
// the default human-readable text shown in inline banners.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error codes used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigMissing,
    InvalidCredentials,
    RateLimited,
    EmailNotConfirmed,
    NetworkError,
    SignatureVerificationFailed,
    MissingPriceId,
    InvalidPlanConfiguration,
    Unauthorized,
    Forbidden,
    NotFound,
    CouldNotParseBody,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ConfigMissing => "Platform configuration is missing",
            Self::InvalidCredentials => "Invalid email or password",
            Self::RateLimited => "Too many attempts. Please wait and try again",
            Self::EmailNotConfirmed => "Email is not confirmed",
            Self::NetworkError => "Network request failed",
            Self::SignatureVerificationFailed => "Webhook signature verification failed",
            Self::MissingPriceId => "Selected plan has no billing price configured",
            Self::InvalidPlanConfiguration => "Plan configuration is invalid",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "You are not allowed to access this resource",
            Self::NotFound => "Not found",
            Self::CouldNotParseBody => "Could not parse request body",
            Self::InternalServerError => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// HTTP status codes used by the API error system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    TooManyRequests = 429,
    InternalServerError = 500,
    BadGateway = 502,
}

impl HttpStatus {
    pub fn status_code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

/// API error carrying an HTTP status, a stable code, and a message.
///
/// Serverless endpoints serialize this as `{"error": message, "code": code}`;
/// the client surfaces the message verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status} {code}: {message}")]
pub struct ApiError {
    pub status: HttpStatus,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: HttpStatus, code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            status,
            code,
        }
    }

    pub fn with_message(status: HttpStatus, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(HttpStatus::BadRequest, code)
    }

    pub fn unauthorized() -> Self {
        Self::new(HttpStatus::Unauthorized, ErrorCode::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(HttpStatus::Forbidden, ErrorCode::Forbidden)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(
            HttpStatus::InternalServerError,
            ErrorCode::InternalServerError,
            message,
        )
    }

    /// JSON body for the error response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.message,
            "code": self.code,
        })
    }
}

/// Internal (non-HTTP) error used for configuration and wiring failures.
#[derive(Debug, thiserror::Error)]
pub enum BankCheckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Unified result type for workspace-internal operations.
pub type Result<T> = std::result::Result<T, BankCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(
            ErrorCode::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            ErrorCode::SignatureVerificationFailed.to_string(),
            "Webhook signature verification failed"
        );
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::MissingPriceId).unwrap();
        assert_eq!(json, "\"MISSING_PRICE_ID\"");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(HttpStatus::Ok.status_code(), 200);
        assert_eq!(HttpStatus::BadRequest.status_code(), 400);
        assert_eq!(HttpStatus::TooManyRequests.status_code(), 429);
    }

    #[test]
    fn test_api_error_json_shape() {
        let err = ApiError::with_message(
            HttpStatus::BadRequest,
            ErrorCode::MissingPriceId,
            "No price configured for plan",
        );
        let json = err.to_json();
        assert_eq!(json["error"], "No price configured for plan");
        assert_eq!(json["code"], "MISSING_PRICE_ID");
    }

    #[test]
    fn test_api_error_default_message_from_code() {
        let err = ApiError::unauthorized();
        assert_eq!(err.message, "Authentication required");
        assert_eq!(err.status, HttpStatus::Unauthorized);
    }
}
