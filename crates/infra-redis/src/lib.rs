// Loner Infrastructure - Redis Adapter
// Implements: LockStore over a Redis server shared by every producer and worker

mod config;
mod lock_store;

pub use config::RedisConfig;
pub use lock_store::RedisLockStore;
