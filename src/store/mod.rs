/// Persistence port for accounts, wallets and the ledger
///
/// Services never touch storage directly: they receive a `LedgerStore` and run
/// each logical operation inside one unit of work obtained from `begin()`.
/// Writes become visible on `commit`; dropping the unit without committing
/// discards them, so a wallet credit and its ledger entry land together or not
/// at all.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::{
    error::WalletResult,
    models::{
        CouponRedemption, PendingSignup, Transaction, TransactionStatus, User, Wallet,
    },
};
use async_trait::async_trait;

/// Storage backend able to open units of work
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> WalletResult<Box<dyn StoreTransaction>>;
}

/// Reads and writes performed inside one unit of work
#[async_trait]
pub trait StoreTransaction: Send {
    // Users

    async fn user_by_id(&mut self, id: &str) -> WalletResult<Option<User>>;

    async fn user_by_email(&mut self, email: &str) -> WalletResult<Option<User>>;

    async fn user_by_account_number(&mut self, account_number: &str)
        -> WalletResult<Option<User>>;

    async fn user_by_referral_code(&mut self, code: &str) -> WalletResult<Option<User>>;

    async fn insert_user(&mut self, user: &User) -> WalletResult<()>;

    /// Persist mutable user fields (role, tier, suspension, gamification)
    async fn update_user(&mut self, user: &User) -> WalletResult<()>;

    async fn count_users(&mut self) -> WalletResult<i64>;

    // Wallets

    async fn wallet(&mut self, user_id: &str) -> WalletResult<Option<Wallet>>;

    async fn insert_wallet(&mut self, wallet: &Wallet) -> WalletResult<()>;

    async fn update_wallet(&mut self, wallet: &Wallet) -> WalletResult<()>;

    // Ledger

    async fn append_transaction(&mut self, transaction: &Transaction) -> WalletResult<()>;

    async fn transaction_by_id(&mut self, id: &str) -> WalletResult<Option<Transaction>>;

    async fn update_transaction_status(
        &mut self,
        id: &str,
        status: TransactionStatus,
    ) -> WalletResult<()>;

    /// Most recent entries for a user, newest first
    async fn recent_transactions(
        &mut self,
        user_id: &str,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>>;

    async fn count_transactions_with_status(
        &mut self,
        status: TransactionStatus,
    ) -> WalletResult<i64>;

    // Pending signup slot

    async fn pending_signup(&mut self) -> WalletResult<Option<PendingSignup>>;

    /// Replace whatever signup is waiting
    async fn put_pending_signup(&mut self, pending: &PendingSignup) -> WalletResult<()>;

    async fn clear_pending_signup(&mut self) -> WalletResult<()>;

    // Admin metadata

    /// Recorded reserve, or `None` before the first write
    async fn reserve_balance(&mut self) -> WalletResult<Option<i64>>;

    async fn set_reserve_balance(&mut self, balance: i64) -> WalletResult<()>;

    // Coupons

    async fn coupon_redeemed(&mut self, user_id: &str, code: &str) -> WalletResult<bool>;

    async fn record_coupon_redemption(
        &mut self,
        redemption: &CouponRedemption,
    ) -> WalletResult<()>;

    /// Make every write of this unit visible
    async fn commit(self: Box<Self>) -> WalletResult<()>;
}
