use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::models::CacheEntry;
use crate::utils::lock;

/// 默认缓存时长：5 分钟
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// 多个消费者共享同一个缓存实例
pub type SharedCache<K, V> = Arc<Mutex<CacheManager<K, V>>>;

/// 内存 TTL 缓存
///
/// 读取时惰性淘汰过期条目，`cleanup` 负责定期批量淘汰。
/// 实例由调用方显式创建并注入，不存在全局单例。
#[derive(Debug)]
pub struct CacheManager<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<K, V> Default for CacheManager<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }
}

impl<K, V> CacheManager<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    pub fn into_shared(self) -> SharedCache<K, V> {
        Arc::new(Mutex::new(self))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 写入缓存，无条件覆盖已有条目
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(key, CacheEntry::new(value, expires_at));
    }

    pub fn set_default(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.set(key, value, ttl);
    }

    /// 读取缓存，过期条目在此处被删除
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// 删除所有满足条件的条目，返回删除数量
    pub fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pred(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 批量淘汰过期条目
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!("Cache cleanup evicted {} expired entries", evicted);
        }
        evicted
    }

    /// 不检查过期时间，仅判断内部表中是否存在
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 启动定期清理任务，返回的句柄可用于 abort
pub fn spawn_cleanup<K, V>(cache: SharedCache<K, V>, every: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // 第一次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            lock(&cache).cleanup();
        }
    })
}
