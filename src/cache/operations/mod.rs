/// 缓存操作
/// 提供缓存操作的功能实现

// TTL 缓存
pub mod ttl;

// 记忆化
pub mod memoize;

// 查询缓存
pub mod query;

pub use memoize::{Memoize, memoize};
pub use query::QueryClient;
pub use ttl::{CacheManager, DEFAULT_TTL, SharedCache, spawn_cleanup};
