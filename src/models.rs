/// Wallet database models
use crate::error::{WalletError, WalletResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> WalletResult<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(WalletError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Subscription tier. Unordered: any tier may be bought from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Basic,
    Gold,
    Elite,
    Platinum,
    Master,
    Diamond,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "BASIC",
            Tier::Gold => "GOLD",
            Tier::Elite => "ELITE",
            Tier::Platinum => "PLATINUM",
            Tier::Master => "MASTER",
            Tier::Diamond => "DIAMOND",
        }
    }

    pub fn from_str(s: &str) -> WalletResult<Self> {
        match s.to_uppercase().as_str() {
            "BASIC" => Ok(Tier::Basic),
            "GOLD" => Ok(Tier::Gold),
            "ELITE" => Ok(Tier::Elite),
            "PLATINUM" => Ok(Tier::Platinum),
            "MASTER" => Ok(Tier::Master),
            "DIAMOND" => Ok(Tier::Diamond),
            _ => Err(WalletError::Validation(format!("Invalid tier: {}", s))),
        }
    }
}

/// Kind of balance-affecting event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Conversion,
    TaskReward,
    PremiumUpgrade,
    TrialStart,
    AdminTransfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Conversion => "CONVERSION",
            TransactionType::TaskReward => "TASK_REWARD",
            TransactionType::PremiumUpgrade => "PREMIUM_UPGRADE",
            TransactionType::TrialStart => "TRIAL_START",
            TransactionType::AdminTransfer => "ADMIN_TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> WalletResult<Self> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "CONVERSION" => Ok(TransactionType::Conversion),
            "TASK_REWARD" => Ok(TransactionType::TaskReward),
            "PREMIUM_UPGRADE" => Ok(TransactionType::PremiumUpgrade),
            "TRIAL_START" => Ok(TransactionType::TrialStart),
            "ADMIN_TRANSFER" => Ok(TransactionType::AdminTransfer),
            _ => Err(WalletError::Internal(format!("Unknown transaction type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> WalletResult<Self> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "APPROVED" => Ok(TransactionStatus::Approved),
            "REJECTED" => Ok(TransactionStatus::Rejected),
            _ => Err(WalletError::Internal(format!("Unknown transaction status: {}", s))),
        }
    }
}

/// User record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// 11-digit public account identifier
    pub account_number: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_suspended: bool,
    pub role: Role,
    pub tier: Tier,
    pub referral_code: String,
    pub referred_by: Option<String>,
    // Gamification fields are stored but not driven by any flow yet.
    pub streak: i64,
    pub xp: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
}

/// Wallet record, one per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub points: i64,
}

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub points: i64,
    pub status: TransactionStatus,
    pub description: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build an approved ledger entry stamped with the current time
    pub fn approved(
        user_id: &str,
        transaction_type: TransactionType,
        amount: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            transaction_type,
            amount,
            points: 0,
            status: TransactionStatus::Approved,
            description: description.into(),
            reference: None,
            created_at: Utc::now(),
        }
    }
}

/// Signup waiting for its one-time code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignup {
    pub email: String,
    pub code: String,
    pub password_hash: String,
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Coupon use by one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub user_id: String,
    pub code: String,
    pub redeemed_at: DateTime<Utc>,
}

/// Reserve and headcount overview for administrators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub reserve_balance: i64,
    pub total_users: i64,
    pub pending_withdrawals: i64,
}

/// User, wallet and recent ledger joined for display. Missing records stay absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user: Option<User>,
    pub wallet: Option<Wallet>,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing_ignores_case() {
        assert_eq!(Tier::from_str("gold").unwrap(), Tier::Gold);
        assert_eq!(Tier::from_str("DIAMOND").unwrap(), Tier::Diamond);
        assert!(Tier::from_str("bronze").is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: "u1".to_string(),
            email: "a@x.com".to_string(),
            account_number: "01234567890".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_verified: true,
            is_suspended: false,
            role: Role::User,
            tier: Tier::Basic,
            referral_code: "ABC123".to_string(),
            referred_by: None,
            streak: 0,
            xp: 0,
            level: 1,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["tier"], "BASIC");
        assert_eq!(json["accountNumber"], "01234567890");
    }

    #[test]
    fn test_transaction_type_wire_names() {
        let tx = Transaction::approved("u1", TransactionType::TaskReward, 500, "Referral bonus");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "TASK_REWARD");
        assert_eq!(json["status"], "APPROVED");
        assert_eq!(
            TransactionType::from_str(TransactionType::AdminTransfer.as_str()).unwrap(),
            TransactionType::AdminTransfer
        );
    }
}
