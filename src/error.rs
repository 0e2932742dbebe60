/// Unified error handling for the service.
///
/// Structure:
/// 1. Domain-specific error types
/// 2. Unified application error with From conversions
/// 3. HTTP response mapping and structured logging
/// 4. Error context enrichment for operation-scoped logs

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Backing key-value store errors
#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
    Operation(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Operation(msg) => write!(f, "Store operation failed: {}", msg),
        }
    }
}

impl StdError for StoreError {}

/// User directory errors
#[derive(Debug)]
pub enum DirectoryError {
    DuplicateEmail(String),
    NotFound(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::DuplicateEmail(msg) => write!(f, "Duplicate entry: {}", msg),
            DirectoryError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl StdError for DirectoryError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication and credential lifecycle errors
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    /// No credential in the expected carrier.
    MissingToken,
    /// Malformed, expired, or wrong signature/issuer.
    TokenInvalid,
    /// Cryptographically valid refresh credential that is not the current
    /// one for its principal. Reuse/theft signal.
    SessionMismatch,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::SessionMismatch => write!(f, "Superseded refresh credential presented"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Auth(AuthError),
    Directory(DirectoryError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Directory(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        AppError::Directory(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Operation(err.to_string())
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking (request ID or trace ID)
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            // Store outages surface as 503 only where the call site lets
            // them propagate (rotation and session establishment).
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE".to_string(),
                "Service temporarily unavailable".to_string(),
            ),

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS".to_string(),
                    "Invalid email or password".to_string(),
                ),
                // Missing, invalid, and superseded credentials are
                // indistinguishable to the caller; the true kind is only
                // logged. Keeps probing from telling expiry apart from
                // detected reuse.
                AuthError::MissingToken | AuthError::TokenInvalid | AuthError::SessionMismatch => (
                    StatusCode::UNAUTHORIZED,
                    "AUTHENTICATION_REQUIRED".to_string(),
                    "Authentication required".to_string(),
                ),
            },

            AppError::Directory(e) => match e {
                DirectoryError::DuplicateEmail(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY".to_string(),
                    e.to_string(),
                ),
                DirectoryError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND".to_string(),
                    e.to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Validation error"
                );
            }
            AppError::Store(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Key-value store error"
                );
            }
            AppError::Auth(AuthError::SessionMismatch) => {
                tracing::warn!(
                    request_id = request_id,
                    "Refresh credential reuse detected"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Authentication error"
                );
            }
            AppError::Directory(DirectoryError::DuplicateEmail(_)) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %self,
                    "Duplicate registration attempt"
                );
            }
            AppError::Directory(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Directory error"
                );
            }
            AppError::Config(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Configuration error"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    request_id = request_id,
                    error = %msg,
                    "Internal error"
                );
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Directory(e) => match e {
                DirectoryError::DuplicateEmail(_) => StatusCode::CONFLICT,
                DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Validation error"
                );
            }
            AppError::Auth(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Authentication error"
                );
            }
            AppError::Directory(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Directory error"
                );
            }
            AppError::Store(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(
                    error = %error,
                    context = ?context,
                    "Operation failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_app_error_conversion() {
        let val_err = ValidationError::InvalidFormat("test".to_string());
        let app_err: AppError = val_err.into();
        match app_err {
            AppError::Validation(_) => (),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_credential_failures_map_to_identical_response() {
        let kinds = [
            AppError::Auth(AuthError::MissingToken),
            AppError::Auth(AuthError::TokenInvalid),
            AppError::Auth(AuthError::SessionMismatch),
        ];

        let responses: Vec<_> = kinds
            .iter()
            .map(|e| <AppError as ErrorHandler>::error_response(e, "req-1"))
            .collect();

        for (status, body) in &responses {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.code, "AUTHENTICATION_REQUIRED");
            assert_eq!(body.message, "Authentication required");
        }
    }

    #[test]
    fn test_invalid_credentials_stays_distinct_from_token_failures() {
        let (status, body) = <AppError as ErrorHandler>::error_response(
            &AppError::Auth(AuthError::InvalidCredentials),
            "req-1",
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "INVALID_CREDENTIALS");
    }

    #[test]
    fn test_store_error_maps_to_503() {
        let err = AppError::Store(StoreError::Unavailable("refused".to_string()));
        let (status, body) = <AppError as ErrorHandler>::error_response(&err, "req-1");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, "STORE_UNAVAILABLE");
        // The outage reason never reaches the caller.
        assert!(!body.message.contains("refused"));
    }

    #[test]
    fn test_error_response_creation() {
        let request_id = "test-123".to_string();
        let response = ErrorResponse::new(
            request_id.clone(),
            "Test error".to_string(),
            "TEST_ERROR".to_string(),
            400,
        );

        assert_eq!(response.error_id, request_id);
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("test_operation");
        assert_eq!(ctx.operation, "test_operation");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("user-123".to_string());
        assert_eq!(ctx_with_user.user_id, Some("user-123".to_string()));
    }
}
