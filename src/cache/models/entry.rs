use tokio::time::Instant;

/// 带过期时间的缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    /// 到达过期时间即视为过期
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
