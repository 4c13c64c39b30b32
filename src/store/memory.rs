/// In-memory persistence for tests and throwaway instances
use super::{LedgerStore, StoreTransaction};
use crate::{
    error::{WalletError, WalletResult},
    models::{
        CouponRedemption, PendingSignup, Transaction, TransactionStatus, User, Wallet,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    wallets: Vec<Wallet>,
    transactions: Vec<Transaction>,
    pending_signup: Option<PendingSignup>,
    reserve_balance: Option<i64>,
    redemptions: Vec<CouponRedemption>,
}

/// Store keeping everything in process memory
///
/// Units of work are serialized: `begin` holds the lock until the unit is
/// committed or dropped, and writes go to a staged copy.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> WalletResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

/// Unit of work over `MemoryStore`
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryTransaction {
    fn find_user(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.staged.users.iter().find(|u| predicate(u)).cloned()
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn user_by_id(&mut self, id: &str) -> WalletResult<Option<User>> {
        Ok(self.find_user(|u| u.id == id))
    }

    async fn user_by_email(&mut self, email: &str) -> WalletResult<Option<User>> {
        Ok(self.find_user(|u| u.email == email))
    }

    async fn user_by_account_number(
        &mut self,
        account_number: &str,
    ) -> WalletResult<Option<User>> {
        Ok(self.find_user(|u| u.account_number == account_number))
    }

    async fn user_by_referral_code(&mut self, code: &str) -> WalletResult<Option<User>> {
        Ok(self.find_user(|u| u.referral_code == code))
    }

    async fn insert_user(&mut self, user: &User) -> WalletResult<()> {
        let clash = self.staged.users.iter().any(|u| {
            u.id == user.id
                || u.email == user.email
                || u.account_number == user.account_number
                || u.referral_code == user.referral_code
        });
        if clash {
            return Err(WalletError::Internal(format!(
                "Unique constraint violated inserting user {}",
                user.id
            )));
        }

        self.staged.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> WalletResult<()> {
        let existing = self
            .staged
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| WalletError::NotFound(format!("User {}", user.id)))?;
        *existing = user.clone();
        Ok(())
    }

    async fn count_users(&mut self) -> WalletResult<i64> {
        Ok(self.staged.users.len() as i64)
    }

    async fn wallet(&mut self, user_id: &str) -> WalletResult<Option<Wallet>> {
        Ok(self
            .staged
            .wallets
            .iter()
            .find(|w| w.user_id == user_id)
            .cloned())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> WalletResult<()> {
        if self.staged.wallets.iter().any(|w| w.user_id == wallet.user_id) {
            return Err(WalletError::Internal(format!(
                "Wallet already exists for user {}",
                wallet.user_id
            )));
        }

        self.staged.wallets.push(wallet.clone());
        Ok(())
    }

    async fn update_wallet(&mut self, wallet: &Wallet) -> WalletResult<()> {
        if wallet.balance < 0 {
            return Err(WalletError::Internal(format!(
                "Refusing negative balance for user {}",
                wallet.user_id
            )));
        }

        let existing = self
            .staged
            .wallets
            .iter_mut()
            .find(|w| w.user_id == wallet.user_id)
            .ok_or_else(|| WalletError::WalletNotFound(wallet.user_id.clone()))?;
        *existing = wallet.clone();
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> WalletResult<()> {
        self.staged.transactions.push(transaction.clone());
        Ok(())
    }

    async fn transaction_by_id(&mut self, id: &str) -> WalletResult<Option<Transaction>> {
        Ok(self
            .staged
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn update_transaction_status(
        &mut self,
        id: &str,
        status: TransactionStatus,
    ) -> WalletResult<()> {
        let existing = self
            .staged
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("Transaction {}", id)))?;
        existing.status = status;
        Ok(())
    }

    async fn recent_transactions(
        &mut self,
        user_id: &str,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        // Append order is chronological order.
        Ok(self
            .staged
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_transactions_with_status(
        &mut self,
        status: TransactionStatus,
    ) -> WalletResult<i64> {
        Ok(self
            .staged
            .transactions
            .iter()
            .filter(|t| t.status == status)
            .count() as i64)
    }

    async fn pending_signup(&mut self) -> WalletResult<Option<PendingSignup>> {
        Ok(self.staged.pending_signup.clone())
    }

    async fn put_pending_signup(&mut self, pending: &PendingSignup) -> WalletResult<()> {
        self.staged.pending_signup = Some(pending.clone());
        Ok(())
    }

    async fn clear_pending_signup(&mut self) -> WalletResult<()> {
        self.staged.pending_signup = None;
        Ok(())
    }

    async fn reserve_balance(&mut self) -> WalletResult<Option<i64>> {
        Ok(self.staged.reserve_balance)
    }

    async fn set_reserve_balance(&mut self, balance: i64) -> WalletResult<()> {
        self.staged.reserve_balance = Some(balance);
        Ok(())
    }

    async fn coupon_redeemed(&mut self, user_id: &str, code: &str) -> WalletResult<bool> {
        Ok(self
            .staged
            .redemptions
            .iter()
            .any(|r| r.user_id == user_id && r.code == code))
    }

    async fn record_coupon_redemption(
        &mut self,
        redemption: &CouponRedemption,
    ) -> WalletResult<()> {
        self.staged.redemptions.push(redemption.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending(email: &str) -> PendingSignup {
        PendingSignup {
            email: email.to_string(),
            code: "123456".to_string(),
            password_hash: "hash".to_string(),
            referral_code: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.set_reserve_balance(42).await.unwrap();
        tx.put_pending_signup(&pending("a@x.com")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.reserve_balance().await.unwrap(), Some(42));
        assert_eq!(tx.pending_signup().await.unwrap().unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn test_dropped_unit_rolls_back() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_reserve_balance(7).await.unwrap();
            tx.append_transaction(&Transaction::approved(
                "u1",
                crate::models::TransactionType::Deposit,
                7,
                "never committed",
            ))
            .await
            .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.reserve_balance().await.unwrap(), None);
        assert!(tx.recent_transactions("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_wallet(&Wallet {
            user_id: "u1".to_string(),
            balance: 10,
            points: 0,
        })
        .await
        .unwrap();

        let result = tx
            .update_wallet(&Wallet {
                user_id: "u1".to_string(),
                balance: -1,
                points: 0,
            })
            .await;
        assert!(result.is_err());
    }
}
