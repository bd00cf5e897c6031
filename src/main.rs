use std::sync::Arc;

use client::{
    AppState,
    cache::spawn_cleanup,
    config::Config,
    poller::{NotificationPoller, NotificationSource},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!("Using API base {}", config.api_base_url);

    // 恢复会话并构建共享状态
    let state = AppState::init(config.clone())
        .await
        .expect("Failed to initialize client state");

    match state.sessions.current() {
        Some(session) => tracing::info!("Signed in as {} ({:?})", session.name, session.role),
        None => tracing::info!("No stored session, notifications paused until login"),
    }

    // 定期清理过期缓存
    let cleanup = spawn_cleanup(state.cache.clone(), config.cache_cleanup_interval());
    let query_cleanup = spawn_cleanup(state.queries.cache().clone(), config.cache_cleanup_interval());

    // 启动通知轮询
    let source: Arc<dyn NotificationSource> = Arc::new(state.api.clone());
    let poller = NotificationPoller::spawn(
        source,
        state.sessions.subscribe(),
        config.notification_poll_interval(),
    );

    let mut updates = poller.subscribe();
    let watch_updates = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let unread = updates.borrow_and_update().unread_count;
            tracing::info!("Unread notifications: {}", unread);
        }
    });

    tracing::info!(
        "Polling notifications every {}s, press Ctrl-C to exit",
        config.notification_poll_interval().as_secs()
    );
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    tracing::info!("Shutting down");
    poller.stop();
    watch_updates.abort();
    cleanup.abort();
    query_cleanup.abort();
}
