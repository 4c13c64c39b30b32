/// Authentication extractors
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::WalletError,
    models::{Role, User},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated user, reloaded from the store on every request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = WalletError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            WalletError::Authentication("Missing authorization header".to_string())
        })?;

        let user = state.account_manager.restore_session(&token).await?;

        Ok(AuthContext { user })
    }
}

/// Authenticated administrator
///
/// The role is read from the stored user, never from the token claims, so a
/// demotion takes effect immediately.
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = WalletError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { user } = AuthContext::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            tracing::warn!("User {} attempted an admin operation", user.id);
            return Err(WalletError::Authorization("Admin role required".to_string()));
        }

        tracing::debug!("Admin request from {}", user.id);
        Ok(AdminAuthContext { user })
    }
}
