//! # Web API Request Handlers
//!
//! HTTP request handlers organized by functional area.

pub mod analytics;
pub mod export;
pub mod health;
