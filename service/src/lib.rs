//! Async service for the daily task verification engine.
//!
//! Wraps [`terra_verification::VerificationEngine`] with TOML configuration,
//! structured logging, per-attempt timeouts and bounded retries.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
pub use service::{today, VerificationService};
