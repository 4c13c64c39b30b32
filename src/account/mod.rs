/// Account lifecycle
///
/// Signup with a one-time code, verification, login, sessions, and the
/// administrative role/suspension switches.

mod manager;
pub mod password;

pub use manager::{normalize_email, normalize_referral_code, AccountManager};
pub(crate) use manager::find_by_identifier;

use crate::models::{Role, User, Wallet};
use serde::{Deserialize, Serialize};

/// Signup request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

/// Signup response; `code` is only present when codes are exposed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub expires_in_secs: i64,
}

/// Verification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticated session handed back to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub user: User,
}

/// Result of a successful verification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAccount {
    pub session: Session,
    pub wallet: Wallet,
}

/// Role change request (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRoleRequest {
    /// Email or account number
    pub identifier: String,
    pub role: Role,
}

/// Suspension toggle request (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSuspendedRequest {
    pub identifier: String,
    pub suspended: bool,
}

/// Shareable referral link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralLink {
    pub referral_code: String,
    pub link: String,
}
