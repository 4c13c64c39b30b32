/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::WalletResult,
    mailer::Mailer,
    naming::AccountNameService,
    rate_limit::RateLimiter,
    store::{LedgerStore, SqliteStore},
    wallet::WalletService,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn LedgerStore>,
    pub account_manager: Arc<AccountManager>,
    pub wallet_service: Arc<WalletService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context backed by the SQLite store
    pub async fn new(config: ServerConfig) -> WalletResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.wallet_db, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        tracing::info!("Wallet database ready at {:?}", config.storage.wallet_db);

        let ctx = Self::with_store(config, Arc::new(SqliteStore::new(pool)))?;

        // Publishes the stored reserve to the gauge before any disbursement.
        let stats = ctx.wallet_service.admin_stats().await?;
        tracing::info!(
            "Reserve balance {} across {} users",
            stats.reserve_balance,
            stats.total_users
        );

        Ok(ctx)
    }

    /// Wire services around an existing store
    pub fn with_store(config: ServerConfig, store: Arc<dyn LedgerStore>) -> WalletResult<Self> {
        let config = Arc::new(config);

        let names = AccountNameService::from_config(&config.name_resolution)?;
        let account_manager = Arc::new(AccountManager::new(store.clone(), config.clone()));
        let wallet_service = Arc::new(WalletService::new(store.clone(), config.clone(), names));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            store,
            account_manager,
            wallet_service,
            rate_limiter,
            mailer,
        })
    }

    async fn ensure_directories(config: &ServerConfig) -> WalletResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        Ok(())
    }
}
