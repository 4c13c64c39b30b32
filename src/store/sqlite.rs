/// SQLite-backed persistence using runtime-built sqlx queries
use super::{LedgerStore, StoreTransaction};
use crate::{
    error::{WalletError, WalletResult},
    models::{
        CouponRedemption, PendingSignup, Role, Tier, Transaction, TransactionStatus,
        TransactionType, User, Wallet,
    },
};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool};

const USER_COLUMNS: &str = "id, email, account_number, password_hash, is_verified, is_suspended,
    role, tier, referral_code, referred_by, streak, xp, level, created_at";

const TRANSACTION_COLUMNS: &str =
    "id, user_id, transaction_type, amount, points, status, description, reference, created_at";

/// Durable store over a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn begin(&self) -> WalletResult<Box<dyn StoreTransaction>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// Unit of work backed by a database transaction
pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

fn user_from_row(row: &SqliteRow) -> WalletResult<User> {
    let role: String = row.try_get("role")?;
    let tier: String = row.try_get("tier")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        account_number: row.try_get("account_number")?,
        password_hash: row.try_get("password_hash")?,
        is_verified: row.try_get("is_verified")?,
        is_suspended: row.try_get("is_suspended")?,
        role: Role::from_str(&role)?,
        tier: Tier::from_str(&tier)?,
        referral_code: row.try_get("referral_code")?,
        referred_by: row.try_get("referred_by")?,
        streak: row.try_get("streak")?,
        xp: row.try_get("xp")?,
        level: row.try_get("level")?,
        created_at: row.try_get("created_at")?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> WalletResult<Transaction> {
    let transaction_type: String = row.try_get("transaction_type")?;
    let status: String = row.try_get("status")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        transaction_type: TransactionType::from_str(&transaction_type)?,
        amount: row.try_get("amount")?,
        points: row.try_get("points")?,
        status: TransactionStatus::from_str(&status)?,
        description: row.try_get("description")?,
        reference: row.try_get("reference")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SqliteTransaction {
    async fn user_where(&mut self, column: &str, value: &str) -> WalletResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn user_by_id(&mut self, id: &str) -> WalletResult<Option<User>> {
        self.user_where("id", id).await
    }

    async fn user_by_email(&mut self, email: &str) -> WalletResult<Option<User>> {
        self.user_where("email", email).await
    }

    async fn user_by_account_number(
        &mut self,
        account_number: &str,
    ) -> WalletResult<Option<User>> {
        self.user_where("account_number", account_number).await
    }

    async fn user_by_referral_code(&mut self, code: &str) -> WalletResult<Option<User>> {
        self.user_where("referral_code", code).await
    }

    async fn insert_user(&mut self, user: &User) -> WalletResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, account_number, password_hash, is_verified, is_suspended,
                                role, tier, referral_code, referred_by, streak, xp, level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.account_number)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(user.is_suspended)
        .bind(user.role.as_str())
        .bind(user.tier.as_str())
        .bind(&user.referral_code)
        .bind(&user.referred_by)
        .bind(user.streak)
        .bind(user.xp)
        .bind(user.level)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> WalletResult<()> {
        let result = sqlx::query(
            "UPDATE users
             SET is_verified = ?1, is_suspended = ?2, role = ?3, tier = ?4,
                 streak = ?5, xp = ?6, level = ?7
             WHERE id = ?8",
        )
        .bind(user.is_verified)
        .bind(user.is_suspended)
        .bind(user.role.as_str())
        .bind(user.tier.as_str())
        .bind(user.streak)
        .bind(user.xp)
        .bind(user.level)
        .bind(&user.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WalletError::NotFound(format!("User {}", user.id)));
        }

        Ok(())
    }

    async fn count_users(&mut self) -> WalletResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn wallet(&mut self, user_id: &str) -> WalletResult<Option<Wallet>> {
        let row = sqlx::query("SELECT user_id, balance, points FROM wallets WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(Wallet {
                user_id: row.try_get("user_id")?,
                balance: row.try_get("balance")?,
                points: row.try_get("points")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> WalletResult<()> {
        sqlx::query("INSERT INTO wallets (user_id, balance, points) VALUES (?1, ?2, ?3)")
            .bind(&wallet.user_id)
            .bind(wallet.balance)
            .bind(wallet.points)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_wallet(&mut self, wallet: &Wallet) -> WalletResult<()> {
        let result = sqlx::query("UPDATE wallets SET balance = ?1, points = ?2 WHERE user_id = ?3")
            .bind(wallet.balance)
            .bind(wallet.points)
            .bind(&wallet.user_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(WalletError::WalletNotFound(wallet.user_id.clone()));
        }

        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> WalletResult<()> {
        sqlx::query(
            "INSERT INTO transactions (id, user_id, transaction_type, amount, points, status,
                                       description, reference, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount)
        .bind(transaction.points)
        .bind(transaction.status.as_str())
        .bind(&transaction.description)
        .bind(&transaction.reference)
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn transaction_by_id(&mut self, id: &str) -> WalletResult<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn update_transaction_status(
        &mut self,
        id: &str,
        status: TransactionStatus,
    ) -> WalletResult<()> {
        let result = sqlx::query("UPDATE transactions SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(WalletError::NotFound(format!("Transaction {}", id)));
        }

        Ok(())
    }

    async fn recent_transactions(
        &mut self,
        user_id: &str,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        // rowid breaks ties between entries written in the same instant
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn count_transactions_with_status(
        &mut self,
        status: TransactionStatus,
    ) -> WalletResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn pending_signup(&mut self) -> WalletResult<Option<PendingSignup>> {
        let row = sqlx::query(
            "SELECT email, code, password_hash, referral_code, created_at
             FROM pending_signup WHERE id = 1",
        )
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(Some(PendingSignup {
                email: row.try_get("email")?,
                code: row.try_get("code")?,
                password_hash: row.try_get("password_hash")?,
                referral_code: row.try_get("referral_code")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn put_pending_signup(&mut self, pending: &PendingSignup) -> WalletResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO pending_signup (id, email, code, password_hash, referral_code, created_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&pending.email)
        .bind(&pending.code)
        .bind(&pending.password_hash)
        .bind(&pending.referral_code)
        .bind(pending.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn clear_pending_signup(&mut self) -> WalletResult<()> {
        sqlx::query("DELETE FROM pending_signup")
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn reserve_balance(&mut self) -> WalletResult<Option<i64>> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT reserve_balance FROM admin_meta WHERE id = 1")
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(balance)
    }

    async fn set_reserve_balance(&mut self, balance: i64) -> WalletResult<()> {
        sqlx::query("INSERT OR REPLACE INTO admin_meta (id, reserve_balance) VALUES (1, ?1)")
            .bind(balance)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn coupon_redeemed(&mut self, user_id: &str, code: &str) -> WalletResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_redemption WHERE user_id = ?1 AND code = ?2",
        )
        .bind(user_id)
        .bind(code)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count > 0)
    }

    async fn record_coupon_redemption(
        &mut self,
        redemption: &CouponRedemption,
    ) -> WalletResult<()> {
        sqlx::query(
            "INSERT INTO coupon_redemption (user_id, code, redeemed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&redemption.user_id)
        .bind(&redemption.code)
        .bind(redemption.redeemed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> WalletResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
