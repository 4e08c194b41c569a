//! Concrete cache backends.

pub mod noop;

#[cfg(feature = "cache-moka")]
pub mod moka;

#[cfg(feature = "cache-redis")]
pub mod redis;

pub use noop::NoOpCacheService;

#[cfg(feature = "cache-moka")]
pub use moka::MokaCacheService;

#[cfg(feature = "cache-redis")]
pub use redis::RedisCacheService;
