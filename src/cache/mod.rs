//! # Cache Module
//!
//! Pluggable key-value cache used by the report cache and the export spooler.
//!
//! ```text
//! CacheProvider (enum)
//!   ├── Redis(RedisCacheService)  <- ConnectionManager-based async Redis
//!   ├── Moka(MokaCacheService)    <- in-process, per-entry TTL
//!   └── NoOp(NoOpCacheService)    <- always-miss, always-succeed fallback
//! ```
//!
//! Enum dispatch keeps calls monomorphic; a misconfigured or unreachable
//! backend degrades to NoOp at startup rather than failing the service.

pub mod errors;
pub mod provider;
pub mod providers;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use provider::CacheProvider;
pub use providers::NoOpCacheService;
pub use traits::CacheService;

#[cfg(feature = "cache-moka")]
pub use providers::MokaCacheService;

#[cfg(feature = "cache-redis")]
pub use providers::RedisCacheService;
