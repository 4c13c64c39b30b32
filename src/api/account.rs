/// Signup, verification, login and session endpoints
use crate::{
    account::{
        normalize_email, LoginRequest, ReferralLink, Session, SignupRequest, SignupResponse,
        VerifiedAccount, VerifyRequest,
    },
    api::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    error::WalletResult,
    models::User,
};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/verify", post(verify))
        .route("/api/login", post(login))
        .route("/api/session", get(session))
        .route("/api/referral", get(referral))
}

/// `?ref=CODE` from a shared referral link
#[derive(Debug, Default, Deserialize)]
struct ReferralQuery {
    #[serde(rename = "ref")]
    referral: Option<String>,
}

async fn signup(
    State(ctx): State<AppContext>,
    Query(query): Query<ReferralQuery>,
    Json(req): Json<SignupRequest>,
) -> WalletResult<Json<ApiResponse<SignupResponse>>> {
    let referral = req
        .referral_code
        .filter(|c| !c.trim().is_empty())
        .or(query.referral);

    let code = ctx
        .account_manager
        .signup(&req.email, &req.password, referral.as_deref())
        .await?;

    let email = normalize_email(&req.email);
    let ttl_secs = ctx.config.signup.code_ttl_secs;
    let expose_code = ctx.config.signup.expose_code;

    if let Err(e) = ctx.mailer.send_signup_code(&email, &code, ttl_secs / 60).await {
        if !expose_code {
            // Mail is the only channel, so the code is unreachable.
            tracing::error!("Failed to mail signup code to {}: {}", email, e);
            ctx.account_manager.discard_signup(&email, &code).await?;
            return Err(e);
        }
        tracing::warn!("Failed to mail signup code to {}: {}", email, e);
    }

    let response = SignupResponse {
        email,
        code: expose_code.then_some(code),
        expires_in_secs: ttl_secs,
    };

    Ok(ApiResponse::ok_with_message(response, "Verification code issued"))
}

async fn verify(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyRequest>,
) -> WalletResult<Json<ApiResponse<VerifiedAccount>>> {
    let (user, wallet) = ctx.account_manager.verify_code(&req.code).await?;
    let session = ctx.account_manager.issue_session(&user)?;

    Ok(ApiResponse::ok(VerifiedAccount { session, wallet }))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> WalletResult<Json<ApiResponse<Session>>> {
    let user = ctx.account_manager.login(&req.email, &req.password).await?;
    tracing::info!("User {} logged in", user.id);

    Ok(ApiResponse::ok(ctx.account_manager.issue_session(&user)?))
}

async fn session(auth: AuthContext) -> Json<ApiResponse<User>> {
    ApiResponse::ok(auth.user)
}

async fn referral(State(ctx): State<AppContext>, auth: AuthContext) -> Json<ApiResponse<ReferralLink>> {
    ApiResponse::ok(ctx.account_manager.referral_link(&auth.user))
}
