//! Identity Service Abstraction
//!
//! The remote store may accept writes from anonymous identities, from
//! authenticated identities, or from nobody at all depending on its policy.
//! The upload core treats credentials as strictly best-effort; this trait is
//! the seam it acquires them through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// An opaque credential proving the caller's authorization to the remote
/// store. May represent an anonymous identity.
///
/// Tokens are replaced wholesale on re-acquisition, never mutated in place.
/// The expiry of a token is unknown to the core; it learns of staleness only
/// through authentication-class failures from the store.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken {
    value: String,
    acquired_at: DateTime<Utc>,
}

impl IdentityToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            acquired_at: Utc::now(),
        }
    }

    /// The raw credential, for use in Authorization headers.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// When this token was handed to the process.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

// Tokens must never end up in logs.
impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToken")
            .field("value", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

/// Credential backend trait.
///
/// Implementations talk to whatever identity provider the deployment uses.
/// All methods may be called concurrently; serialization of acquisition is
/// handled by the caller (`core-auth`), not here.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// The credential the backend currently holds, if any.
    async fn current(&self) -> Option<IdentityToken>;

    /// Acquire a fresh anonymous credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider is unreachable or refuses
    /// anonymous sign-in.
    async fn acquire_anonymous(&self) -> Result<IdentityToken>;

    /// Drop any credential the backend holds.
    async fn invalidate(&self);
}
