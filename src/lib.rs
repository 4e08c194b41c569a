//! # Coursedash Analytics Core
//!
//! Analytics aggregation, report caching, and export spooling for the
//! Coursedash e-learning platform admin dashboard.
//!
//! ## Architecture
//!
//! ```text
//! HTTP request
//!   -> Period resolution        (analytics::period)
//!   -> Report cache lookup      (analytics::report_cache, cache::CacheProvider)
//!   -> on miss: fan-out queries (analytics::assembler, database::queries)
//!   -> numeric normalization    (analytics::numeric)
//!   -> cache write-back + JSON response envelope (web)
//! ```
//!
//! Exports follow a separate pipeline: an explicit export action persists a
//! dataset under an opaque id with a short TTL, retrieved later as JSON or
//! flattened CSV (analytics::export).
//!
//! The cache is pluggable: Redis for multi-instance deployments, Moka for
//! in-process caching, and a NoOp fallback when no backend is available.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod resilience;
pub mod web;

pub use error::{CoreError, Result};
