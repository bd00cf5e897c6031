use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub notification_poll_secs: u64,
    pub cache_ttl_ms: u64,
    pub cache_cleanup_secs: u64,
    pub bundle_delay_ms: u64,
    pub query_stale_ms: u64,
    pub scroll_throttle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/".to_string(),
            session_file: PathBuf::from(".session.json"),
            notification_poll_secs: 30,
            cache_ttl_ms: 300_000,
            cache_cleanup_secs: 60,
            bundle_delay_ms: 50,
            query_stale_ms: 60_000,
            scroll_throttle_ms: 16,
        }
    }
}

/// 读取数值配置，缺失或格式错误时使用默认值
fn parse_or<T, L>(lookup: &L, name: &str, default: T) -> T
where
    T: std::str::FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源构建配置，`from_env` 以进程环境为来源
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let api_base_url = match lookup("API_BASE_URL") {
            Some(raw) => {
                // 保证以 `/` 结尾，join 相对路径时不会丢掉最后一段
                let raw = if raw.ends_with('/') { raw } else { format!("{}/", raw) };
                Url::parse(&raw)
                    .map_err(|e| AppError::Config(format!("API_BASE_URL: {}", e)))?;
                raw
            }
            None => defaults.api_base_url,
        };

        Ok(Config {
            api_base_url,
            session_file: lookup("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            notification_poll_secs: parse_or(&lookup, "NOTIFICATION_POLL_SECS", defaults.notification_poll_secs),
            cache_ttl_ms: parse_or(&lookup, "CACHE_TTL_MS", defaults.cache_ttl_ms),
            cache_cleanup_secs: parse_or(&lookup, "CACHE_CLEANUP_SECS", defaults.cache_cleanup_secs),
            bundle_delay_ms: parse_or(&lookup, "BUNDLE_DELAY_MS", defaults.bundle_delay_ms),
            query_stale_ms: parse_or(&lookup, "QUERY_STALE_MS", defaults.query_stale_ms),
            scroll_throttle_ms: parse_or(&lookup, "SCROLL_THROTTLE_MS", defaults.scroll_throttle_ms),
        })
    }

    pub fn api_base_url(&self) -> Result<Url, AppError> {
        Url::parse(&self.api_base_url)
            .map_err(|e| AppError::Config(format!("API_BASE_URL: {}", e)))
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_secs.max(1))
    }

    pub fn bundle_delay(&self) -> Duration {
        Duration::from_millis(self.bundle_delay_ms)
    }

    pub fn query_stale_time(&self) -> Duration {
        Duration::from_millis(self.query_stale_ms)
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }
}
