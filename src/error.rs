/// Unified error types for the LoopRewards wallet service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for wallet and account operations
#[derive(Error, Debug)]
pub enum WalletError {
    /// Signup attempted for an email that already has an account
    #[error("Identity already registered: {0}")]
    DuplicateIdentity(String),

    /// One-time code missing, wrong, or expired
    #[error("Verification code mismatch")]
    CodeMismatch,

    /// Login or session rejected
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Coupon code not in the catalog
    #[error("Invalid coupon code: {0}")]
    InvalidCoupon(String),

    /// Coupon already used by this account
    #[error("Coupon already redeemed: {0}")]
    CouponAlreadyRedeemed(String),

    /// User has no wallet
    #[error("Wallet not found for user {0}")]
    WalletNotFound(String),

    /// Balance lower than the requested debit
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    /// No user matches the disbursement identifier
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Reserve lower than the requested disbursement
    #[error("Reserve depleted: reserve {reserve}, requested {requested}")]
    ReserveDepleted { reserve: i64, requested: i64 },

    /// Missing entity without a more specific reason
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Stable machine-readable code carried in the failure envelope
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::DuplicateIdentity(_) => "DuplicateIdentity",
            WalletError::CodeMismatch => "CodeMismatch",
            WalletError::AccessDenied(_) => "AccessDenied",
            WalletError::InvalidCoupon(_) => "InvalidCoupon",
            WalletError::CouponAlreadyRedeemed(_) => "CouponAlreadyRedeemed",
            WalletError::WalletNotFound(_) => "WalletNotFound",
            WalletError::InsufficientFunds { .. } => "InsufficientFunds",
            WalletError::RecipientNotFound(_) => "RecipientNotFound",
            WalletError::ReserveDepleted { .. } => "ReserveDepleted",
            WalletError::NotFound(_) => "NotFound",
            WalletError::Validation(_) => "InvalidRequest",
            WalletError::Authentication(_) | WalletError::Jwt(_) => "AuthenticationRequired",
            WalletError::Authorization(_) => "Forbidden",
            WalletError::RateLimitExceeded { .. } => "RateLimitExceeded",
            WalletError::Database(_) | WalletError::Io(_) | WalletError::Internal(_) => {
                "InternalServerError"
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            WalletError::DuplicateIdentity(_) | WalletError::CouponAlreadyRedeemed(_) => {
                StatusCode::CONFLICT
            }
            WalletError::CodeMismatch
            | WalletError::InvalidCoupon(_)
            | WalletError::Validation(_) => StatusCode::BAD_REQUEST,
            WalletError::AccessDenied(_)
            | WalletError::Authentication(_)
            | WalletError::Jwt(_) => StatusCode::UNAUTHORIZED,
            WalletError::Authorization(_) => StatusCode::FORBIDDEN,
            WalletError::WalletNotFound(_)
            | WalletError::RecipientNotFound(_)
            | WalletError::NotFound(_) => StatusCode::NOT_FOUND,
            WalletError::InsufficientFunds { .. } | WalletError::ReserveDepleted { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WalletError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            WalletError::Database(_) | WalletError::Io(_) | WalletError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Failure envelope returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// Convert WalletError to HTTP response
impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            WalletError::Database(_) | WalletError::Io(_) | WalletError::Internal(_) => {
                tracing::error!("Request failed: {}", self);
                "Internal server error".to_string() // Don't leak details
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorEnvelope {
            success: false,
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_details_are_hidden() {
        let response = WalletError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        assert_eq!(
            WalletError::InsufficientFunds { balance: 10, required: 20 }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(WalletError::CodeMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WalletError::DuplicateIdentity("a@x.com".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WalletError::RecipientNotFound("nobody".to_string()).code(),
            "RecipientNotFound"
        );
    }
}
