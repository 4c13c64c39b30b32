/// LoopRewards - simulated fintech wallet service
use loop_rewards::{config::ServerConfig, context::AppContext, error::WalletResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> WalletResult<()> {
    let config = ServerConfig::from_env()?;

    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("loop_rewards={},tower_http={}", level, level).into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    print_banner();

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __                      ____                             __
   / /   ____  ____  ____  / __ \___ _      ______ __________/ /____
  / /   / __ \/ __ \/ __ \/ /_/ / _ \ | /| / / __ `/ ___/ __  / ___/
 / /___/ /_/ / /_/ / /_/ / _, _/  __/ |/ |/ / /_/ / /  / /_/ (__  )
/_____/\____/\____/ .___/_/ |_|\___/|__/|__/\__,_/_/   \__,_/____/
                 /_/
        Simulated wallet service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
