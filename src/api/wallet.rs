/// Wallet endpoints for authenticated users
use crate::{
    api::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    error::{WalletError, WalletResult},
    models::{Dashboard, Transaction},
    wallet::{
        catalog::{self, Bank, TierOffer},
        Payout, PayoutRequest, RedeemCouponRequest, RedeemCouponResponse, ResolveNameRequest,
        ResolveNameResponse, UpgradeTierRequest,
    },
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Build wallet routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/coupons/redeem", post(redeem_coupon))
        .route("/api/tiers", get(list_tiers))
        .route("/api/tiers/upgrade", post(upgrade_tier))
        .route("/api/banks", get(list_banks))
        .route("/api/payouts/resolve", post(resolve_account_name))
        .route("/api/payouts", post(request_payout))
}

async fn dashboard(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> WalletResult<Json<ApiResponse<Dashboard>>> {
    Ok(ApiResponse::ok(ctx.wallet_service.dashboard(&auth.user.id).await?))
}

async fn redeem_coupon(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<RedeemCouponRequest>,
) -> WalletResult<Json<ApiResponse<RedeemCouponResponse>>> {
    let result = ctx
        .wallet_service
        .redeem_coupon(&auth.user.id, &req.code)
        .await?;

    Ok(ApiResponse::ok(result))
}

async fn list_tiers() -> Json<ApiResponse<&'static [TierOffer]>> {
    ApiResponse::ok(catalog::TIER_OFFERS)
}

/// Buy a catalog tier at its listed price
async fn upgrade_tier(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpgradeTierRequest>,
) -> WalletResult<Json<ApiResponse<Transaction>>> {
    let offer = catalog::tier_offer(req.tier).ok_or_else(|| {
        WalletError::Validation(format!("Tier {} is not for sale", req.tier.as_str()))
    })?;

    let entry = ctx
        .wallet_service
        .upgrade_tier(&auth.user.id, offer.tier, offer.price)
        .await?;

    Ok(ApiResponse::ok(entry))
}

async fn list_banks() -> Json<ApiResponse<&'static [Bank]>> {
    ApiResponse::ok(catalog::BANKS)
}

async fn resolve_account_name(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Json(req): Json<ResolveNameRequest>,
) -> Json<ApiResponse<ResolveNameResponse>> {
    let account_name = ctx
        .wallet_service
        .resolve_account_name(&req.bank_id, &req.account_number)
        .await;

    ApiResponse::ok(ResolveNameResponse { account_name })
}

async fn request_payout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<PayoutRequest>,
) -> WalletResult<Json<ApiResponse<Payout>>> {
    let payout = ctx
        .wallet_service
        .request_payout(&auth.user.id, &req.bank_id, &req.account_number, req.amount)
        .await?;

    Ok(ApiResponse::ok_with_message(payout, "Payout queued for review"))
}
