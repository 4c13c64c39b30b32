/// Wallet and ledger operations
///
/// Every balance change and its ledger entry are written in the same unit of
/// work, so neither is ever observed without the other.

pub mod catalog;
mod service;

pub use service::WalletService;

use crate::models::{Tier, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCouponRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponResponse {
    pub amount: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeTierRequest {
    pub tier: Tier,
}

/// Admin disbursement from the reserve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisburseRequest {
    /// Email or account number of the recipient
    pub identifier: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveNameRequest {
    pub bank_id: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveNameResponse {
    pub account_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub bank_id: String,
    pub account_number: String,
    pub amount: i64,
}

/// Pending withdrawal together with its settlement details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub transaction: Transaction,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayoutRequest {
    pub transaction_id: String,
    pub approve: bool,
}
