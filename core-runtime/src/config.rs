//! # Upload Policy Configuration
//!
//! Every tunable the upload engine consults lives here, behind a builder
//! with fail-fast validation. The defaults are tuned for degraded mobile
//! networks talking to an object store known to stall mid-transfer; hosts
//! with better connectivity can tighten them.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::UploadConfig;
//! use std::time::Duration;
//!
//! let config = UploadConfig::builder()
//!     .stall_window(Duration::from_secs(30))
//!     .max_asset_bytes(8 * 1024 * 1024)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.stall_window, Duration::from_secs(30));
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Policy constants for one upload pipeline.
///
/// Constructed through [`UploadConfig::builder`]; a successfully built config
/// is internally consistent and never re-validated downstream.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// How long a running attempt may go without byte progress before it is
    /// failed as stalled
    pub stall_window: Duration,

    /// Wall-clock ceiling for one resumable attempt, progress or not
    pub resumable_ceiling: Duration,

    /// Wall-clock ceiling for one one-shot attempt
    pub oneshot_ceiling: Duration,

    /// How often a heartbeat progress snapshot is emitted while a transfer
    /// is quiet
    pub heartbeat_interval: Duration,

    /// Attempts at resolving the destination URL after a successful transfer
    pub url_resolve_attempts: u32,

    /// Delay between URL resolution attempts
    pub url_resolve_spacing: Duration,

    /// First retry backoff delay
    pub backoff_base: Duration,

    /// Upper bound on the exponential backoff delay
    pub backoff_cap: Duration,

    /// Attempt bound for the resumable strategy
    pub resumable_attempts: u32,

    /// Attempt bound for each one-shot strategy
    pub oneshot_attempts: u32,

    /// Timeout on a single anonymous identity acquisition
    pub auth_acquire_timeout: Duration,

    /// How many acquisition attempts before identity is marked unavailable
    pub auth_acquire_attempts: u32,

    /// Pause after invalidating credentials before re-acquiring, letting the
    /// identity backend settle
    pub auth_settle_delay: Duration,

    /// Smallest acceptable asset
    pub min_asset_bytes: u64,

    /// Largest acceptable asset
    pub max_asset_bytes: u64,

    /// MIME types the validator accepts
    pub accepted_types: Vec<String>,

    /// Cache-Control value recorded on stored objects
    pub cache_control: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            stall_window: Duration::from_secs(60),
            resumable_ceiling: Duration::from_secs(300),
            oneshot_ceiling: Duration::from_secs(180),
            heartbeat_interval: Duration::from_secs(5),
            url_resolve_attempts: 3,
            url_resolve_spacing: Duration::from_secs(1),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(8),
            resumable_attempts: 2,
            oneshot_attempts: 1,
            auth_acquire_timeout: Duration::from_secs(4),
            auth_acquire_attempts: 2,
            auth_settle_delay: Duration::from_millis(300),
            min_asset_bytes: 1024,
            max_asset_bytes: 15 * 1024 * 1024,
            accepted_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            cache_control: Some("public, max-age=31536000".to_string()),
        }
    }
}

impl UploadConfig {
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder::default()
    }
}

/// Builder for [`UploadConfig`] with fail-fast validation.
#[derive(Debug, Default)]
pub struct UploadConfigBuilder {
    config: UploadConfig,
}

impl UploadConfigBuilder {
    pub fn stall_window(mut self, value: Duration) -> Self {
        self.config.stall_window = value;
        self
    }

    pub fn resumable_ceiling(mut self, value: Duration) -> Self {
        self.config.resumable_ceiling = value;
        self
    }

    pub fn oneshot_ceiling(mut self, value: Duration) -> Self {
        self.config.oneshot_ceiling = value;
        self
    }

    pub fn heartbeat_interval(mut self, value: Duration) -> Self {
        self.config.heartbeat_interval = value;
        self
    }

    pub fn url_resolve_attempts(mut self, value: u32) -> Self {
        self.config.url_resolve_attempts = value;
        self
    }

    pub fn url_resolve_spacing(mut self, value: Duration) -> Self {
        self.config.url_resolve_spacing = value;
        self
    }

    pub fn backoff_base(mut self, value: Duration) -> Self {
        self.config.backoff_base = value;
        self
    }

    pub fn backoff_cap(mut self, value: Duration) -> Self {
        self.config.backoff_cap = value;
        self
    }

    pub fn resumable_attempts(mut self, value: u32) -> Self {
        self.config.resumable_attempts = value;
        self
    }

    pub fn oneshot_attempts(mut self, value: u32) -> Self {
        self.config.oneshot_attempts = value;
        self
    }

    pub fn auth_acquire_timeout(mut self, value: Duration) -> Self {
        self.config.auth_acquire_timeout = value;
        self
    }

    pub fn auth_acquire_attempts(mut self, value: u32) -> Self {
        self.config.auth_acquire_attempts = value;
        self
    }

    pub fn auth_settle_delay(mut self, value: Duration) -> Self {
        self.config.auth_settle_delay = value;
        self
    }

    pub fn min_asset_bytes(mut self, value: u64) -> Self {
        self.config.min_asset_bytes = value;
        self
    }

    pub fn max_asset_bytes(mut self, value: u64) -> Self {
        self.config.max_asset_bytes = value;
        self
    }

    pub fn accepted_types(mut self, value: Vec<String>) -> Self {
        self.config.accepted_types = value;
        self
    }

    pub fn cache_control(mut self, value: Option<String>) -> Self {
        self.config.cache_control = value;
        self
    }

    /// Validate and produce the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] with an actionable message when a field is
    /// out of range or fields contradict each other.
    pub fn build(self) -> Result<UploadConfig> {
        let c = self.config;

        if c.stall_window.is_zero() {
            return Err(Error::Config("stall_window must be non-zero".to_string()));
        }
        if c.resumable_ceiling.is_zero() || c.oneshot_ceiling.is_zero() {
            return Err(Error::Config(
                "attempt ceilings must be non-zero".to_string(),
            ));
        }
        if c.heartbeat_interval.is_zero() {
            return Err(Error::Config(
                "heartbeat_interval must be non-zero".to_string(),
            ));
        }
        if c.url_resolve_attempts == 0 {
            return Err(Error::Config(
                "url_resolve_attempts must be at least 1".to_string(),
            ));
        }
        if c.backoff_base.is_zero() || c.backoff_cap < c.backoff_base {
            return Err(Error::Config(
                "backoff_base must be non-zero and no larger than backoff_cap".to_string(),
            ));
        }
        if c.resumable_attempts == 0 || c.oneshot_attempts == 0 {
            return Err(Error::Config(
                "every strategy needs at least 1 attempt".to_string(),
            ));
        }
        if c.auth_acquire_attempts == 0 {
            return Err(Error::Config(
                "auth_acquire_attempts must be at least 1".to_string(),
            ));
        }
        if c.min_asset_bytes == 0 || c.min_asset_bytes >= c.max_asset_bytes {
            return Err(Error::Config(format!(
                "asset size bounds invalid: min {} must be positive and below max {}",
                c.min_asset_bytes, c.max_asset_bytes
            )));
        }
        if c.accepted_types.is_empty() {
            return Err(Error::Config(
                "accepted_types must name at least one MIME type".to_string(),
            ));
        }

        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = UploadConfig::builder().build().unwrap();
        assert_eq!(config.stall_window, Duration::from_secs(60));
        assert_eq!(config.resumable_ceiling, Duration::from_secs(300));
        assert_eq!(config.oneshot_ceiling, Duration::from_secs(180));
        assert_eq!(config.resumable_attempts, 2);
        assert_eq!(config.oneshot_attempts, 1);
        assert_eq!(config.max_asset_bytes, 15 * 1024 * 1024);
    }

    #[test]
    fn test_zero_stall_window_rejected() {
        let result = UploadConfig::builder()
            .stall_window(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_inverted_size_bounds_rejected() {
        let result = UploadConfig::builder()
            .min_asset_bytes(1024)
            .max_asset_bytes(512)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_backoff_cap_below_base_rejected() {
        let result = UploadConfig::builder()
            .backoff_base(Duration::from_secs(4))
            .backoff_cap(Duration::from_secs(2))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let result = UploadConfig::builder().accepted_types(vec![]).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_values_survive_build() {
        let config = UploadConfig::builder()
            .resumable_attempts(3)
            .backoff_base(Duration::from_millis(500))
            .backoff_cap(Duration::from_secs(4))
            .build()
            .unwrap();
        assert_eq!(config.resumable_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_millis(500));
    }
}
