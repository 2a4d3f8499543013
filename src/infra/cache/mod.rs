//! Key-value store adapters backing the post cache.

mod lock;
mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
