/// 缓存键模块
/// 提供记忆化键与查询键的生成

pub mod memo_keys;
pub mod query_keys;

pub use memo_keys::memo_key;
pub use query_keys::QueryKey;
