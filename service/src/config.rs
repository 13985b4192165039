//! Service configuration with TOML file support.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use terra_types::EngineParams;

use crate::logging::LogFormat;
use crate::ServiceError;

/// Largest UTC offset any civil time zone uses, in seconds.
const MAX_UTC_OFFSET_SECS: i32 = 14 * 3600;

/// Configuration for a [`VerificationService`](crate::VerificationService).
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,terra_verification=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on a single attempt of any operation.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Attempts per operation, counting the first, when the store is unavailable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Offset east of UTC used to derive the user's current day.
    #[serde(default)]
    pub utc_offset_secs: i32,

    #[serde(default)]
    pub params: EngineParams,
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

impl ServiceConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        self.log_format()?;
        if self.max_attempts == 0 {
            return Err(ServiceError::Config("max_attempts must be at least 1".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ServiceError::Config("request_timeout_ms must be positive".into()));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ServiceError::Config(
                "backoff_base_ms must not exceed backoff_max_ms".into(),
            ));
        }
        if self.utc_offset_secs.abs() > MAX_UTC_OFFSET_SECS {
            return Err(ServiceError::Config(format!(
                "utc_offset_secs {} is outside ±{MAX_UTC_OFFSET_SECS}",
                self.utc_offset_secs
            )));
        }
        if self.params.proof_quota == 0 {
            return Err(ServiceError::Config("params.proof_quota must be at least 1".into()));
        }
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, ServiceError> {
        self.log_format.parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay before retry number `retry` (1-based): doubling from the base, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            utc_offset_secs: 0,
            params: EngineParams::default(),
        }
    }
}
