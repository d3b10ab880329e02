//! 主应用程序入口
//!
//! 组装配置、数据库、认证与聊天中心，启动 Axum WebSocket 服务。

use std::sync::Arc;

use application::{ChatHub, SystemClock};
use config::HubConfig;
use infrastructure::{create_pg_pool, JwtAuthService, PgMessageStore};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 生产入口强制要求 DATABASE_URL 和 JWT_SECRET，缺失即失败
    let config = HubConfig::from_env();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let auth = Arc::new(JwtAuthService::new(&config.jwt.secret, pg_pool.clone()));
    let store = Arc::new(PgMessageStore::new(pg_pool));

    let hub = ChatHub::new(
        config.rate_limit.clone(),
        config.chat.clone(),
        Arc::new(SystemClock),
        auth,
        store,
    );

    let app = router(AppState::new(hub));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天中心启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
