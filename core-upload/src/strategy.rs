//! Transfer strategies.
//!
//! Each strategy is one way of handing bytes to the object store. They are
//! deliberately thin: no retries, no deadlines, no progress bookkeeping -
//! all of that lives in the session and retry layers that wrap them. A
//! strategy maps the prepared upload onto exactly one store call and
//! forwards whatever raw progress the store reports.

use async_trait::async_trait;
use bridge_traits::identity::IdentityToken;
use bridge_traits::store::{ObjectRef, ObjectStore, PutProgress, PutRequest, StoreResult};
use core_runtime::config::UploadConfig;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::request::PreparedUpload;

/// Identity of a transfer strategy, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyId {
    /// Chunked resumable session; survives brief interruptions
    Resumable,
    /// Single authenticated one-shot request
    Direct,
    /// Single unauthenticated one-shot request
    Public,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resumable => write!(f, "resumable"),
            Self::Direct => write!(f, "direct"),
            Self::Public => write!(f, "public"),
        }
    }
}

/// One way of moving the payload to the store.
#[async_trait]
pub trait TransferStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Whether a cached token should be attached when one is available.
    fn wants_identity(&self) -> bool;

    /// Retry budget for this strategy, including the first attempt.
    fn max_attempts(&self, config: &UploadConfig) -> u32;

    /// Wall-clock ceiling for a single attempt.
    fn total_ceiling(&self, config: &UploadConfig) -> Duration;

    /// Perform exactly one transfer. Implementations must not retry.
    async fn transfer(
        &self,
        store: &dyn ObjectStore,
        config: &UploadConfig,
        prepared: &PreparedUpload,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef>;
}

/// Chunked resumable transfer, first in the chain.
pub struct ResumableStrategy;

#[async_trait]
impl TransferStrategy for ResumableStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Resumable
    }

    fn wants_identity(&self) -> bool {
        true
    }

    fn max_attempts(&self, config: &UploadConfig) -> u32 {
        config.resumable_attempts
    }

    fn total_ceiling(&self, config: &UploadConfig) -> Duration {
        config.resumable_ceiling
    }

    async fn transfer(
        &self,
        store: &dyn ObjectStore,
        config: &UploadConfig,
        prepared: &PreparedUpload,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef> {
        store
            .put_resumable(put_request(prepared, config), token, progress)
            .await
    }
}

/// Authenticated one-shot transfer, the fallback when resumable sessions
/// misbehave.
pub struct DirectStrategy;

#[async_trait]
impl TransferStrategy for DirectStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Direct
    }

    fn wants_identity(&self) -> bool {
        true
    }

    fn max_attempts(&self, config: &UploadConfig) -> u32 {
        config.oneshot_attempts
    }

    fn total_ceiling(&self, config: &UploadConfig) -> Duration {
        config.oneshot_ceiling
    }

    async fn transfer(
        &self,
        store: &dyn ObjectStore,
        config: &UploadConfig,
        prepared: &PreparedUpload,
        token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef> {
        // One-shot puts report no intermediate progress.
        drop(progress);
        store.put(put_request(prepared, config), token).await
    }
}

/// Unauthenticated one-shot transfer, the last resort for stores whose
/// write policy permits anonymous puts.
pub struct PublicStrategy;

#[async_trait]
impl TransferStrategy for PublicStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Public
    }

    fn wants_identity(&self) -> bool {
        false
    }

    fn max_attempts(&self, config: &UploadConfig) -> u32 {
        config.oneshot_attempts
    }

    fn total_ceiling(&self, config: &UploadConfig) -> Duration {
        config.oneshot_ceiling
    }

    async fn transfer(
        &self,
        store: &dyn ObjectStore,
        config: &UploadConfig,
        prepared: &PreparedUpload,
        _token: Option<&IdentityToken>,
        progress: mpsc::Sender<PutProgress>,
    ) -> StoreResult<ObjectRef> {
        drop(progress);
        store.put(put_request(prepared, config), None).await
    }
}

/// Store request shared by every strategy: same path, same payload, same
/// metadata, regardless of transport.
fn put_request(prepared: &PreparedUpload, config: &UploadConfig) -> PutRequest {
    let request = &prepared.request;
    let mut custom_metadata = HashMap::new();
    custom_metadata.insert(
        "display-name".to_string(),
        request.display_name().to_string(),
    );

    PutRequest {
        path: prepared.path.clone(),
        bytes: request.bytes().clone(),
        content_type: request.content_type().to_string(),
        cache_control: config.cache_control.clone(),
        custom_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::UploadRequest;
    use bridge_traits::store::StoreError;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records which store entry point each strategy used and with what
    /// credentials.
    #[derive(Default)]
    struct RecordingStore {
        put_calls: AtomicU32,
        resumable_calls: AtomicU32,
        tokens: Mutex<Vec<Option<String>>>,
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(
            &self,
            request: PutRequest,
            token: Option<&IdentityToken>,
        ) -> StoreResult<ObjectRef> {
            self.put_calls.fetch_add(1, Ordering::Relaxed);
            self.tokens
                .lock()
                .unwrap()
                .push(token.map(|t| t.as_str().to_string()));
            self.paths.lock().unwrap().push(request.path.clone());
            Ok(ObjectRef {
                path: request.path,
                size: request.bytes.len() as u64,
                generation: None,
            })
        }

        async fn put_resumable(
            &self,
            request: PutRequest,
            token: Option<&IdentityToken>,
            _progress: mpsc::Sender<PutProgress>,
        ) -> StoreResult<ObjectRef> {
            self.resumable_calls.fetch_add(1, Ordering::Relaxed);
            self.tokens
                .lock()
                .unwrap()
                .push(token.map(|t| t.as_str().to_string()));
            Ok(ObjectRef {
                path: request.path,
                size: request.bytes.len() as u64,
                generation: None,
            })
        }

        async fn resolve_url(&self, reference: &ObjectRef) -> StoreResult<String> {
            Ok(format!("https://store.example/{}", reference.path))
        }

        async fn delete(&self, _path: &str, _token: Option<&IdentityToken>) -> StoreResult<()> {
            Err(StoreError::Unknown("not used here".to_string()))
        }
    }

    fn prepared() -> PreparedUpload {
        PreparedUpload {
            request: UploadRequest::new(
                Bytes::from_static(&[0u8; 64]),
                "image/png",
                "covers",
                "test",
            ),
            path: "covers/test-1700000000-abc123.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resumable_uses_resumable_endpoint() {
        let store = RecordingStore::default();
        let config = UploadConfig::default();
        let (tx, _rx) = mpsc::channel(8);
        let token = IdentityToken::new("tok");

        ResumableStrategy
            .transfer(&store, &config, &prepared(), Some(&token), tx)
            .await
            .unwrap();

        assert_eq!(store.resumable_calls.load(Ordering::Relaxed), 1);
        assert_eq!(store.put_calls.load(Ordering::Relaxed), 0);
        assert_eq!(
            store.tokens.lock().unwrap().as_slice(),
            &[Some("tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_direct_uses_oneshot_endpoint_with_token() {
        let store = RecordingStore::default();
        let config = UploadConfig::default();
        let (tx, _rx) = mpsc::channel(8);
        let token = IdentityToken::new("tok");

        DirectStrategy
            .transfer(&store, &config, &prepared(), Some(&token), tx)
            .await
            .unwrap();

        assert_eq!(store.put_calls.load(Ordering::Relaxed), 1);
        assert_eq!(
            store.tokens.lock().unwrap().as_slice(),
            &[Some("tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_public_drops_token_even_when_offered() {
        let store = RecordingStore::default();
        let config = UploadConfig::default();
        let (tx, _rx) = mpsc::channel(8);
        let token = IdentityToken::new("tok");

        PublicStrategy
            .transfer(&store, &config, &prepared(), Some(&token), tx)
            .await
            .unwrap();

        assert_eq!(store.put_calls.load(Ordering::Relaxed), 1);
        assert_eq!(store.tokens.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_budgets_come_from_config() {
        let config = UploadConfig::default();
        assert_eq!(ResumableStrategy.max_attempts(&config), 2);
        assert_eq!(DirectStrategy.max_attempts(&config), 1);
        assert_eq!(PublicStrategy.max_attempts(&config), 1);
        assert!(ResumableStrategy.total_ceiling(&config) > DirectStrategy.total_ceiling(&config));
    }

    #[test]
    fn test_put_request_carries_metadata() {
        let config = UploadConfig::default();
        let request = put_request(&prepared(), &config);
        assert_eq!(request.content_type, "image/png");
        assert_eq!(request.cache_control, config.cache_control);
        assert_eq!(
            request.custom_metadata.get("display-name").map(String::as_str),
            Some("test")
        );
    }
}
