/// Wallet service: coupons, tier upgrades, disbursements, payouts and the dashboard
use crate::{
    account::find_by_identifier,
    config::ServerConfig,
    error::{WalletError, WalletResult},
    metrics,
    models::{
        AdminStats, CouponRedemption, Dashboard, Tier, Transaction, TransactionStatus,
        TransactionType, Wallet,
    },
    naming::AccountNameService,
    store::LedgerStore,
    wallet::{catalog, Payout, RedeemCouponResponse},
};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;

const PAYOUT_REFERENCE_LEN: usize = 9;

fn generate_payout_reference() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..PAYOUT_REFERENCE_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Ledger-backed wallet operations
pub struct WalletService {
    store: Arc<dyn LedgerStore>,
    config: Arc<ServerConfig>,
    names: AccountNameService,
}

impl WalletService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        config: Arc<ServerConfig>,
        names: AccountNameService,
    ) -> Self {
        Self {
            store,
            config,
            names,
        }
    }

    /// Credit a coupon to the user's wallet
    pub async fn redeem_coupon(&self, user_id: &str, code: &str) -> WalletResult<RedeemCouponResponse> {
        let (code, amount) = catalog::coupon_value(code)
            .ok_or_else(|| WalletError::InvalidCoupon(code.trim().to_string()))?;

        let mut tx = self.store.begin().await?;
        let mut wallet = tx
            .wallet(user_id)
            .await?
            .ok_or_else(|| WalletError::WalletNotFound(user_id.to_string()))?;

        if tx.coupon_redeemed(user_id, code).await? {
            return Err(WalletError::CouponAlreadyRedeemed(code.to_string()));
        }

        wallet.balance += amount;
        tx.update_wallet(&wallet).await?;
        tx.append_transaction(&Transaction::approved(
            user_id,
            TransactionType::Conversion,
            amount,
            format!("Coupon redeemed: {}", code),
        ))
        .await?;
        tx.record_coupon_redemption(&CouponRedemption {
            user_id: user_id.to_string(),
            code: code.to_string(),
            redeemed_at: Utc::now(),
        })
        .await?;
        tx.commit().await?;

        metrics::record_coupon_redemption(code);
        metrics::record_ledger_entry(TransactionType::Conversion.as_str());
        tracing::info!("User {} redeemed {} for {}", user_id, code, amount);

        Ok(RedeemCouponResponse {
            amount,
            balance: wallet.balance,
        })
    }

    /// Buy a tier for `price`; leaves everything untouched when funds are short
    pub async fn upgrade_tier(&self, user_id: &str, tier: Tier, price: i64) -> WalletResult<Transaction> {
        if price < 0 {
            return Err(WalletError::Validation("Price cannot be negative".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let mut user = tx
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("User {}", user_id)))?;
        let mut wallet = tx
            .wallet(user_id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("Wallet for user {}", user_id)))?;

        if wallet.balance < price {
            return Err(WalletError::InsufficientFunds {
                balance: wallet.balance,
                required: price,
            });
        }

        wallet.balance -= price;
        user.tier = tier;
        tx.update_wallet(&wallet).await?;
        tx.update_user(&user).await?;

        let entry = Transaction::approved(
            user_id,
            TransactionType::PremiumUpgrade,
            price,
            format!("Tier upgrade: {}", tier.as_str()),
        );
        tx.append_transaction(&entry).await?;
        tx.commit().await?;

        metrics::record_ledger_entry(TransactionType::PremiumUpgrade.as_str());
        tracing::info!("User {} upgraded to {} for {}", user_id, tier.as_str(), price);

        Ok(entry)
    }

    /// Move funds from the reserve into a user's wallet
    pub async fn admin_disburse(&self, identifier: &str, amount: i64) -> WalletResult<Transaction> {
        if amount <= 0 {
            return Err(WalletError::Validation(
                "Disbursement amount must be positive".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let recipient = find_by_identifier(tx.as_mut(), identifier)
            .await?
            .ok_or_else(|| WalletError::RecipientNotFound(identifier.trim().to_string()))?;

        let reserve = tx
            .reserve_balance()
            .await?
            .unwrap_or(self.config.rewards.initial_reserve);
        if reserve < amount {
            return Err(WalletError::ReserveDepleted {
                reserve,
                requested: amount,
            });
        }

        let mut wallet = tx
            .wallet(&recipient.id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("Wallet for user {}", recipient.id)))?;

        wallet.balance += amount;
        tx.update_wallet(&wallet).await?;
        tx.set_reserve_balance(reserve - amount).await?;

        let entry = Transaction::approved(
            &recipient.id,
            TransactionType::AdminTransfer,
            amount,
            "Central reserve disbursement",
        );
        tx.append_transaction(&entry).await?;
        tx.commit().await?;

        metrics::record_ledger_entry(TransactionType::AdminTransfer.as_str());
        metrics::set_reserve_balance(reserve - amount);
        tracing::info!("Disbursed {} to {} (reserve now {})", amount, recipient.id, reserve - amount);

        Ok(entry)
    }

    /// Resolve the holder name of a bank account
    pub async fn resolve_account_name(&self, bank_id: &str, account_number: &str) -> String {
        self.names.resolve_account_name(bank_id, account_number).await
    }

    /// Debit the wallet and queue a pending withdrawal for review
    pub async fn request_payout(
        &self,
        user_id: &str,
        bank_id: &str,
        account_number: &str,
        amount: i64,
    ) -> WalletResult<Payout> {
        if amount <= 0 {
            return Err(WalletError::Validation("Payout amount must be positive".to_string()));
        }

        let bank = catalog::bank_by_id(bank_id)
            .ok_or_else(|| WalletError::Validation(format!("Unknown bank: {}", bank_id)))?;

        let account_number = account_number.trim();
        if !(10..=11).contains(&account_number.len())
            || !account_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(WalletError::Validation(
                "Account number must be 10 or 11 digits".to_string(),
            ));
        }

        // Resolve before opening the unit of work; the collaborator may be slow.
        let account_name = self.names.resolve_account_name(bank_id, account_number).await;

        let mut tx = self.store.begin().await?;
        let mut wallet = tx
            .wallet(user_id)
            .await?
            .ok_or_else(|| WalletError::WalletNotFound(user_id.to_string()))?;

        if wallet.balance < amount {
            return Err(WalletError::InsufficientFunds {
                balance: wallet.balance,
                required: amount,
            });
        }

        wallet.balance -= amount;
        tx.update_wallet(&wallet).await?;

        let mut entry = Transaction::approved(
            user_id,
            TransactionType::Withdrawal,
            amount,
            format!("Payout to {} {} ({})", bank.name, account_number, account_name),
        );
        entry.status = TransactionStatus::Pending;
        entry.reference = Some(generate_payout_reference());
        tx.append_transaction(&entry).await?;
        tx.commit().await?;

        metrics::record_ledger_entry(TransactionType::Withdrawal.as_str());
        tracing::info!("Payout {} of {} queued for {}", entry.id, amount, user_id);

        Ok(Payout {
            transaction: entry,
            bank_name: bank.name.to_string(),
            account_number: account_number.to_string(),
            account_name,
        })
    }

    /// Approve or reject a pending withdrawal; rejection refunds the amount
    pub async fn review_payout(&self, transaction_id: &str, approve: bool) -> WalletResult<Transaction> {
        let mut tx = self.store.begin().await?;
        let mut entry = tx
            .transaction_by_id(transaction_id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("Transaction {}", transaction_id)))?;

        if entry.transaction_type != TransactionType::Withdrawal
            || entry.status != TransactionStatus::Pending
        {
            return Err(WalletError::Validation(format!(
                "Transaction {} is not a pending withdrawal",
                transaction_id
            )));
        }

        if approve {
            entry.status = TransactionStatus::Approved;
            tx.update_transaction_status(&entry.id, entry.status).await?;
        } else {
            let mut wallet = tx
                .wallet(&entry.user_id)
                .await?
                .ok_or_else(|| WalletError::WalletNotFound(entry.user_id.clone()))?;

            entry.status = TransactionStatus::Rejected;
            tx.update_transaction_status(&entry.id, entry.status).await?;

            wallet.balance += entry.amount;
            tx.update_wallet(&wallet).await?;

            let mut refund = Transaction::approved(
                &entry.user_id,
                TransactionType::Deposit,
                entry.amount,
                "Payout rejected: funds returned",
            );
            refund.reference = entry.reference.clone();
            tx.append_transaction(&refund).await?;
        }
        tx.commit().await?;

        if !approve {
            metrics::record_ledger_entry(TransactionType::Deposit.as_str());
        }
        tracing::info!("Payout {} {}", entry.id, entry.status.as_str());

        Ok(entry)
    }

    /// Reserve and headcount overview
    pub async fn admin_stats(&self) -> WalletResult<AdminStats> {
        let mut tx = self.store.begin().await?;
        let reserve_balance = tx
            .reserve_balance()
            .await?
            .unwrap_or(self.config.rewards.initial_reserve);
        metrics::set_reserve_balance(reserve_balance);

        Ok(AdminStats {
            reserve_balance,
            total_users: tx.count_users().await?,
            pending_withdrawals: tx
                .count_transactions_with_status(TransactionStatus::Pending)
                .await?,
        })
    }

    /// User, wallet and latest ledger entries; missing records are simply absent
    pub async fn dashboard(&self, user_id: &str) -> WalletResult<Dashboard> {
        let mut tx = self.store.begin().await?;
        let user = tx.user_by_id(user_id).await?;
        let wallet: Option<Wallet> = tx.wallet(user_id).await?;
        let transactions = tx
            .recent_transactions(user_id, self.config.rewards.dashboard_transactions)
            .await?;

        Ok(Dashboard {
            user,
            wallet,
            transactions,
        })
    }
}
