/// Account and wallet flows against the SQLite store
use loop_rewards::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::WalletError,
    models::{Role, Tier, TransactionStatus, TransactionType},
    naming::AccountNameService,
    store::{LedgerStore, SqliteStore},
    wallet::WalletService,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Services {
    accounts: AccountManager,
    wallets: WalletService,
    store: Arc<SqliteStore>,
}

async fn services_on(pool: sqlx::SqlitePool) -> Services {
    db::run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteStore::new(pool));
    let config = Arc::new(ServerConfig::default());

    Services {
        accounts: AccountManager::new(store.clone(), config.clone()),
        wallets: WalletService::new(
            store.clone(),
            config,
            AccountNameService::new(None, Duration::ZERO),
        ),
        store,
    }
}

async fn memory_services() -> Services {
    services_on(db::create_memory_pool().await.unwrap()).await
}

#[tokio::test]
async fn test_full_lifecycle_on_sqlite() {
    let s = memory_services().await;

    let code = s.accounts.signup("host@loop.test", "pw", None).await.unwrap();
    let (host, _) = s.accounts.verify_code(&code).await.unwrap();

    let code = s
        .accounts
        .signup("guest@loop.test", "pw", Some(&host.referral_code))
        .await
        .unwrap();
    let (guest, _) = s.accounts.verify_code(&code).await.unwrap();
    assert_eq!(guest.referred_by.as_deref(), Some(host.id.as_str()));

    s.wallets.redeem_coupon(&host.id, "STOICTRUST").await.unwrap();
    s.wallets.upgrade_tier(&host.id, Tier::Elite, 5000).await.unwrap();

    let dashboard = s.wallets.dashboard(&host.id).await.unwrap();
    assert_eq!(dashboard.user.as_ref().unwrap().tier, Tier::Elite);
    // 1250 start + 500 referral + 2500 coupon - 5000 upgrade
    assert_eq!(dashboard.wallet.as_ref().unwrap().balance, 0);

    let types: Vec<TransactionType> = dashboard
        .transactions
        .iter()
        .map(|t| t.transaction_type)
        .collect();
    assert_eq!(
        types,
        vec![
            TransactionType::PremiumUpgrade,
            TransactionType::Conversion,
            TransactionType::TaskReward,
        ]
    );
}

#[tokio::test]
async fn test_coupon_redeemed_once_per_user_on_sqlite() {
    let s = memory_services().await;
    let code = s.accounts.signup("coupon@loop.test", "pw", None).await.unwrap();
    let (first, _) = s.accounts.verify_code(&code).await.unwrap();
    let code = s.accounts.signup("other@loop.test", "pw", None).await.unwrap();
    let (second, _) = s.accounts.verify_code(&code).await.unwrap();

    s.wallets.redeem_coupon(&first.id, "welcome500").await.unwrap();
    let repeat = s.wallets.redeem_coupon(&first.id, "WELCOME500").await;
    assert!(matches!(repeat, Err(WalletError::CouponAlreadyRedeemed(_))));

    // Another code, or another user, is still allowed.
    s.wallets.redeem_coupon(&first.id, "LOOPPRO").await.unwrap();
    s.wallets.redeem_coupon(&second.id, "WELCOME500").await.unwrap();

    let dashboard = s.wallets.dashboard(&first.id).await.unwrap();
    assert_eq!(dashboard.wallet.unwrap().balance, 1250 + 500 + 1000);
    assert_eq!(dashboard.transactions.len(), 2);

    let mut tx = s.store.begin().await.unwrap();
    assert!(tx.coupon_redeemed(&first.id, "WELCOME500").await.unwrap());
    assert!(tx.coupon_redeemed(&second.id, "WELCOME500").await.unwrap());
    assert!(!tx.coupon_redeemed(&second.id, "LOOPPRO").await.unwrap());
}

#[tokio::test]
async fn test_role_and_suspension_persist_on_sqlite() {
    let s = memory_services().await;
    let code = s.accounts.signup("flags@loop.test", "pw", None).await.unwrap();
    let (user, _) = s.accounts.verify_code(&code).await.unwrap();
    assert_eq!(user.role, Role::User);

    s.accounts.set_role(&user.email, Role::Admin).await.unwrap();
    s.accounts.set_suspended(&user.account_number, true).await.unwrap();

    let stored = s.accounts.get_user(&user.id).await.unwrap();
    assert_eq!(stored.role, Role::Admin);
    assert!(stored.is_suspended);
    assert!(matches!(
        s.accounts.login("flags@loop.test", "pw").await,
        Err(WalletError::AccessDenied(_))
    ));

    s.accounts.set_suspended(&user.email, false).await.unwrap();
    s.accounts.set_role(&user.account_number, Role::User).await.unwrap();

    let restored = s.accounts.login("flags@loop.test", "pw").await.unwrap();
    assert_eq!(restored.role, Role::User);
    assert!(!restored.is_suspended);
    assert_eq!(restored.account_number, user.account_number);
}

#[tokio::test]
async fn test_failed_upgrade_rolls_back_on_sqlite() {
    let s = memory_services().await;
    let code = s.accounts.signup("poor@loop.test", "pw", None).await.unwrap();
    let (user, _) = s.accounts.verify_code(&code).await.unwrap();

    let result = s.wallets.upgrade_tier(&user.id, Tier::Platinum, 10_000).await;
    assert!(matches!(result, Err(WalletError::InsufficientFunds { .. })));

    let dashboard = s.wallets.dashboard(&user.id).await.unwrap();
    assert_eq!(dashboard.user.unwrap().tier, Tier::Basic);
    assert_eq!(dashboard.wallet.unwrap().balance, 1250);
    assert!(dashboard.transactions.is_empty());
}

#[tokio::test]
async fn test_payout_review_on_sqlite() {
    let s = memory_services().await;
    let code = s.accounts.signup("payout@loop.test", "pw", None).await.unwrap();
    let (user, _) = s.accounts.verify_code(&code).await.unwrap();

    let payout = s
        .wallets
        .request_payout(&user.id, "2", "01234567890", 600)
        .await
        .unwrap();
    assert_eq!(s.wallets.admin_stats().await.unwrap().pending_withdrawals, 1);

    let approved = s
        .wallets
        .review_payout(&payout.transaction.id, true)
        .await
        .unwrap();
    assert_eq!(approved.status, TransactionStatus::Approved);

    let mut tx = s.store.begin().await.unwrap();
    let stored = tx
        .transaction_by_id(&payout.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Approved);
    assert_eq!(stored.reference, payout.transaction.reference);
    assert_eq!(tx.wallet(&user.id).await.unwrap().unwrap().balance, 650);
}

#[tokio::test]
async fn test_state_survives_reopening_database_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet.sqlite");

    let user_id = {
        let pool = db::create_pool(&path, db::DatabaseOptions::default())
            .await
            .unwrap();
        let s = services_on(pool.clone()).await;

        let code = s.accounts.signup("durable@loop.test", "pw", None).await.unwrap();
        let (user, _) = s.accounts.verify_code(&code).await.unwrap();
        s.wallets.admin_disburse("durable@loop.test", 750).await.unwrap();

        pool.close().await;
        user.id
    };

    let pool = db::create_pool(&path, db::DatabaseOptions::default())
        .await
        .unwrap();
    let s = services_on(pool).await;

    let dashboard = s.wallets.dashboard(&user_id).await.unwrap();
    assert_eq!(dashboard.wallet.unwrap().balance, 2000);
    assert_eq!(dashboard.transactions.len(), 1);

    let stats = s.wallets.admin_stats().await.unwrap();
    assert_eq!(stats.reserve_balance, 1_500_000 - 750);
    assert!(s.accounts.login("durable@loop.test", "pw").await.is_ok());
}
