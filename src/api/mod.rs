/// HTTP API routes and the response envelope
pub mod account;
pub mod admin;
pub mod health;
pub mod middleware;
pub mod wallet;

use crate::context::AppContext;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

/// Success envelope shared by every endpoint
///
/// Failures use `error::ErrorEnvelope`, which carries the same `success`,
/// `error` and `message` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        })
    }
}

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(account::routes())
        .merge(wallet::routes())
        .merge(admin::routes())
}
