/// Administrative endpoints
///
/// Every handler takes `AdminAuthContext`, which rejects non-admin callers
/// before the handler body runs.
use crate::{
    account::{SetRoleRequest, SetSuspendedRequest},
    api::ApiResponse,
    auth::AdminAuthContext,
    context::AppContext,
    error::WalletResult,
    models::{AdminStats, Transaction, User},
    wallet::{DisburseRequest, ReviewPayoutRequest},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/disburse", post(disburse))
        .route("/api/admin/payouts/review", post(review_payout))
        .route("/api/admin/roles", post(set_role))
        .route("/api/admin/suspension", post(set_suspended))
}

async fn stats(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> WalletResult<Json<ApiResponse<AdminStats>>> {
    Ok(ApiResponse::ok(ctx.wallet_service.admin_stats().await?))
}

async fn disburse(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Json(req): Json<DisburseRequest>,
) -> WalletResult<Json<ApiResponse<Transaction>>> {
    tracing::info!(
        "Admin {} disbursing {} to {}",
        auth.user.id,
        req.amount,
        req.identifier
    );

    let entry = ctx
        .wallet_service
        .admin_disburse(&req.identifier, req.amount)
        .await?;

    Ok(ApiResponse::ok(entry))
}

async fn review_payout(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Json(req): Json<ReviewPayoutRequest>,
) -> WalletResult<Json<ApiResponse<Transaction>>> {
    tracing::info!(
        "Admin {} reviewing payout {} (approve: {})",
        auth.user.id,
        req.transaction_id,
        req.approve
    );

    let entry = ctx
        .wallet_service
        .review_payout(&req.transaction_id, req.approve)
        .await?;

    Ok(ApiResponse::ok(entry))
}

async fn set_role(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Json(req): Json<SetRoleRequest>,
) -> WalletResult<Json<ApiResponse<User>>> {
    let user = ctx
        .account_manager
        .set_role(&req.identifier, req.role)
        .await?;

    Ok(ApiResponse::ok(user))
}

async fn set_suspended(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Json(req): Json<SetSuspendedRequest>,
) -> WalletResult<Json<ApiResponse<User>>> {
    let user = ctx
        .account_manager
        .set_suspended(&req.identifier, req.suspended)
        .await?;

    Ok(ApiResponse::ok(user))
}
