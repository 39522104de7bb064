//! Auth policy and state types.

use core_runtime::config::UploadConfig;
use std::time::Duration;

/// Bounds on anonymous identity acquisition.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Timeout on a single acquisition attempt
    pub acquire_timeout: Duration,
    /// How many attempts before identity is marked unavailable
    pub acquire_attempts: u32,
    /// Pause between invalidation and re-acquisition
    pub settle_delay: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(4),
            acquire_attempts: 2,
            settle_delay: Duration::from_millis(300),
        }
    }
}

impl From<&UploadConfig> for AuthPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            acquire_timeout: config.auth_acquire_timeout,
            acquire_attempts: config.auth_acquire_attempts,
            settle_delay: config.auth_settle_delay,
        }
    }
}

/// What the gate currently knows about identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityAvailability {
    /// No acquisition has been attempted yet
    Unknown,
    /// A token is cached and will be attached to transfers
    Available,
    /// Acquisition failed persistently; uploads proceed unauthenticated
    BestEffortUnavailable,
}
