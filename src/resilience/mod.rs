//! Fault isolation primitives.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitState, DatabaseCircuitBreaker};
