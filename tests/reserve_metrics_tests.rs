/// Reserve gauge publication; kept in its own binary since the registry is global
use loop_rewards::{config::ServerConfig, context::AppContext, metrics::render_metrics};
use tempfile::TempDir;

fn reserve_line(metrics: &str) -> Option<String> {
    metrics
        .lines()
        .find(|line| line.starts_with("wallet_reserve_balance "))
        .map(str::to_string)
}

#[tokio::test]
async fn test_reserve_gauge_reflects_stored_reserve() {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.storage.data_directory = dir.path().to_path_buf();
    config.storage.wallet_db = dir.path().join("wallet.sqlite");
    config.rewards.initial_reserve = 777_000;

    let ctx = AppContext::new(config).await.unwrap();
    assert_eq!(
        reserve_line(&render_metrics()).as_deref(),
        Some("wallet_reserve_balance 777000")
    );

    let code = ctx
        .account_manager
        .signup("gauge@loop.test", "pw", None)
        .await
        .unwrap();
    ctx.account_manager.verify_code(&code).await.unwrap();
    ctx.wallet_service
        .admin_disburse("gauge@loop.test", 7_000)
        .await
        .unwrap();
    assert_eq!(
        reserve_line(&render_metrics()).as_deref(),
        Some("wallet_reserve_balance 770000")
    );

    let stats = ctx.wallet_service.admin_stats().await.unwrap();
    assert_eq!(stats.reserve_balance, 770_000);
    assert_eq!(
        reserve_line(&render_metrics()).as_deref(),
        Some("wallet_reserve_balance 770000")
    );
}
