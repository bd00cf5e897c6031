use std::future::Future;
use std::time::Duration;

use crate::cache::keys::QueryKey;
use crate::cache::operations::ttl::{CacheManager, SharedCache};
use crate::utils::lock;

/// 查询缓存：按查询键缓存读取结果，写操作成功后按前缀失效
#[derive(Clone)]
pub struct QueryClient<V> {
    cache: SharedCache<QueryKey, V>,
    stale_time: Duration,
}

impl<V> QueryClient<V>
where
    V: Clone,
{
    pub fn new(stale_time: Duration) -> Self {
        Self::with_cache(CacheManager::with_default_ttl(stale_time).into_shared())
    }

    /// 复用外部注入的缓存实例
    pub fn with_cache(cache: SharedCache<QueryKey, V>) -> Self {
        let stale_time = lock(&cache).default_ttl();
        Self { cache, stale_time }
    }

    pub fn cache(&self) -> &SharedCache<QueryKey, V> {
        &self.cache
    }

    /// 命中新鲜缓存直接返回，否则执行 loader 并写入缓存
    ///
    /// loader 失败时不写缓存，错误原样返回。
    pub async fn fetch<F, Fut, E>(&self, key: QueryKey, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cached = lock(&self.cache).get(&key);
        if let Some(hit) = cached {
            tracing::debug!("Query cache hit: {}", key);
            return Ok(hit);
        }

        tracing::debug!("Query cache miss: {}", key);
        let value = loader().await?;
        lock(&self.cache).set(key, value.clone(), self.stale_time);
        Ok(value)
    }

    pub fn get(&self, key: &QueryKey) -> Option<V> {
        lock(&self.cache).get(key)
    }

    /// 直接写入查询结果，例如写操作返回了最新数据
    pub fn set(&self, key: QueryKey, value: V) {
        lock(&self.cache).set(key, value, self.stale_time);
    }

    /// 让所有以 prefix 开头的查询失效
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let removed = lock(&self.cache).remove_where(|key| key.starts_with(prefix));
        tracing::debug!("Invalidated {} queries under {}", removed, prefix);
        removed
    }

    /// 执行写操作，成功后使相关查询失效
    pub async fn mutate<Fut, T, E>(&self, mutation: Fut, invalidates: &[QueryKey]) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let output = mutation.await?;
        for prefix in invalidates {
            self.invalidate(prefix);
        }
        Ok(output)
    }
}
