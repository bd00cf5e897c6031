use std::sync::Arc;

use config::Config;
use error::AppError;
use reqwest::Url;
use serde_json::Value;

pub mod api;
pub mod bundler;
pub mod cache;
pub mod config;
pub mod error;
pub mod hints;
pub mod monitor;
pub mod poller;
pub mod scroll;
pub mod session;
pub mod timing;
pub mod workers;

mod utils;

use api::ApiClient;
use bundler::RequestBundler;
use cache::{CacheManager, QueryClient, SharedCache};
use session::{Session, SessionStore};
use timing::ThrottleGate;
use utils::lock;

/// 客户端共享状态，由调用方显式创建后注入各视图
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub api: ApiClient,
    pub sessions: Arc<SessionStore>,
    /// 按请求路径缓存的 GET 响应
    pub cache: SharedCache<String, Value>,
    pub queries: QueryClient<Value>,
}

impl AppState {
    pub async fn init(config: Config) -> Result<Self, AppError> {
        let base: Url = config.api_base_url()?;
        let sessions = SessionStore::restore(config.session_file.clone()).await?;

        Ok(Self {
            api: ApiClient::new(base),
            sessions: Arc::new(sessions),
            cache: CacheManager::with_default_ttl(config.cache_ttl()).into_shared(),
            queries: QueryClient::new(config.query_stale_time()),
            config,
        })
    }

    /// 以当前会话读取接口，命中缓存时不发请求
    pub async fn get_cached(&self, path: &str) -> Result<Value, AppError> {
        let token = self.sessions.token().ok_or(AppError::Unauthorized)?;

        let cached = lock(&self.cache).get(path);
        if let Some(hit) = cached {
            tracing::debug!("Response cache hit: {}", path);
            return Ok(hit);
        }

        let value: Value = self.api.get_json(path, &token).await?;
        lock(&self.cache).set_default(path.to_string(), value.clone());
        Ok(value)
    }

    pub async fn login(&self, session: Session) -> Result<(), AppError> {
        self.clear_caches();
        self.sessions.login(session).await
    }

    /// 登出并丢弃上一个用户的缓存数据
    pub async fn logout(&self) -> Result<Option<Session>, AppError> {
        self.clear_caches();
        self.sessions.logout().await
    }

    /// 滚动事件节流窗口
    pub fn scroll_gate(&self) -> ThrottleGate {
        ThrottleGate::new(self.config.scroll_throttle())
    }

    /// 按配置的静默期创建请求合并器
    pub fn bundler<T, E>(&self) -> RequestBundler<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        RequestBundler::new(self.config.bundle_delay())
    }

    fn clear_caches(&self) {
        lock(&self.cache).clear();
        lock(self.queries.cache()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn state(dir: &TempDir) -> AppState {
        let config = Config {
            // 端口 9 上没有 HTTP 服务，缓存未命中会直接失败
            api_base_url: "http://127.0.0.1:9/api/".into(),
            session_file: dir.path().join("session.json"),
            bundle_delay_ms: 25,
            scroll_throttle_ms: 40,
            ..Config::default()
        };
        AppState::init(config).await.unwrap()
    }

    fn student() -> Session {
        Session::new("s-1", "Kim", "kim@school.edu", Role::Student, "tok")
    }

    #[tokio::test]
    async fn cached_read_requires_session() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;
        assert!(matches!(
            state.get_cached("courses").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn cached_read_skips_network_on_hit() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;
        state.login(student()).await.unwrap();

        lock(&state.cache).set_default("courses".to_string(), json!([{ "id": 1 }]));
        assert_eq!(state.get_cached("courses").await.unwrap(), json!([{ "id": 1 }]));

        assert!(matches!(state.get_cached("grades").await, Err(AppError::Http(_))));
        assert!(!lock(&state.cache).contains_key("grades"));
    }

    #[tokio::test]
    async fn logout_drops_cached_responses() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;
        state.login(student()).await.unwrap();
        lock(&state.cache).set_default("courses".to_string(), json!([]));
        state.queries.set("courses".into(), json!([]));

        state.logout().await.unwrap();
        assert!(lock(&state.cache).is_empty());
        assert!(lock(state.queries.cache()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timing_settings_come_from_config() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir).await;

        assert_eq!(state.scroll_gate().limit(), Duration::from_millis(40));

        let bundler: RequestBundler<u8, ()> = state.bundler();
        let ticket = bundler.enqueue(|| async { Ok(1) });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bundler.queued(), 1);
        assert_eq!(ticket.await, Ok(1));
    }
}
