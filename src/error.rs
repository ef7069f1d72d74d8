// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::roles::RoleLookupError;
use crate::auth::token::TokenError;
use crate::database::DatabaseError;
use crate::services::payment::PaymentError;

/// Message sent for a missing, garbled or expired token
pub const MSG_FORBIDDEN_ACCESS: &str = "forbidden access";
/// Message sent when a valid identity lacks the admin role
pub const MSG_FORBIDDEN: &str = "forbidden";
/// Message sent when a valid identity asks about someone else
pub const MSG_UNAUTHORIZED_ACCESS: &str = "unauthorized access";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401: no token, or a token that does not verify
    Unauthenticated(String),

    // 403: valid identity, insufficient role
    Forbidden(String),

    // 403: valid identity, wrong resource scope
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthenticated(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::Unauthorized(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthenticated(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body.
    ///
    /// Guard rejections carry only `message`; web clients match on the exact body.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Unauthenticated(msg) | ApiError::Forbidden(msg) | ApiError::Unauthorized(msg) => {
                json!({ "message": msg })
            }
            _ => json!({
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// 401 `forbidden access`
    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated(MSG_FORBIDDEN_ACCESS.to_string())
    }

    /// 403 `forbidden`
    pub fn forbidden() -> Self {
        ApiError::Forbidden(MSG_FORBIDDEN.to_string())
    }

    /// 403 `unauthorized access`
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized(MSG_UNAUTHORIZED_ACCESS.to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Database pool unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<RoleLookupError> for ApiError {
    fn from(err: RoleLookupError) -> Self {
        tracing::error!("Role lookup failed: {}", err);
        ApiError::service_unavailable("service unavailable")
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::EmptyClaim => ApiError::bad_request(err.to_string()),
            TokenError::Expired | TokenError::Invalid(_) => ApiError::unauthenticated(),
            TokenError::MissingSecret | TokenError::Generation(_) => {
                tracing::error!("Token issuance failed: {}", err);
                ApiError::internal_server_error("Failed to issue token")
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidAmount(_) => ApiError::bad_request(err.to_string()),
            PaymentError::NotConfigured => {
                tracing::error!("Payment provider is not configured");
                ApiError::service_unavailable("Payments are temporarily unavailable")
            }
            PaymentError::Provider { .. } | PaymentError::Transport(_) => {
                tracing::error!("Payment provider error: {}", err);
                ApiError::bad_gateway("Payment provider error")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

/// Handler result carrying a JSON body
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejections_carry_only_message() {
        assert_eq!(ApiError::unauthenticated().to_json(), json!({ "message": "forbidden access" }));
        assert_eq!(ApiError::forbidden().to_json(), json!({ "message": "forbidden" }));
        assert_eq!(ApiError::unauthorized().to_json(), json!({ "message": "unauthorized access" }));
    }

    #[test]
    fn guard_rejection_statuses() {
        assert_eq!(ApiError::unauthenticated().status_code(), 401);
        assert_eq!(ApiError::forbidden().status_code(), 403);
        assert_eq!(ApiError::unauthorized().status_code(), 403);
    }

    #[test]
    fn other_errors_include_code() {
        let body = ApiError::bad_request("invalid id: x").to_json();
        assert_eq!(body["message"], "invalid id: x");
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[test]
    fn token_failures_map_to_forbidden_access() {
        let err: ApiError = TokenError::Expired.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), MSG_FORBIDDEN_ACCESS);
    }
}
