/// Request rate limiting
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{WalletError, WalletResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn quota(rps: u32, burst: u32) -> Quota {
    let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rps);
    Quota::per_second(rps).allow_burst(burst)
}

fn limited(limiter: &DirectLimiter) -> WalletResult<()> {
    limiter.check().map_err(|_| WalletError::RateLimitExceeded {
        retry_after: Duration::from_secs(1),
    })
}

/// Three direct limiters: anonymous, authenticated, and admin traffic
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
    admin: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = config.burst_size;

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(quota(config.authenticated_rps, burst))),
            unauthenticated: Arc::new(GovernorLimiter::direct(quota(
                config.unauthenticated_rps,
                burst / 5,
            ))),
            admin: Arc::new(GovernorLimiter::direct(quota(
                config.admin_rps,
                burst.saturating_mul(2),
            ))),
        }
    }

    pub fn check_authenticated(&self) -> WalletResult<()> {
        limited(&self.authenticated)
    }

    pub fn check_unauthenticated(&self) -> WalletResult<()> {
        limited(&self.unauthenticated)
    }

    pub fn check_admin(&self) -> WalletResult<()> {
        limited(&self.admin)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    if !ctx.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let is_admin = request.uri().path().starts_with("/api/admin");
    let has_auth_header = request.headers().get("authorization").is_some();

    let result = if is_admin && has_auth_header {
        ctx.rate_limiter.check_admin()
    } else if has_auth_header {
        ctx.rate_limiter.check_authenticated()
    } else {
        ctx.rate_limiter.check_unauthenticated()
    };

    match result {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!("Rate limit exceeded for {}", request.uri().path());
            e.into_response()
        }
    }
}
