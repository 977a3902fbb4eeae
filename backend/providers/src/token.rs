use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use screensage_core::{SageError, TokenExchanger};

/// Seconds shaved off the vendor-reported lifetime so a token is never
/// presented right at its expiry instant.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

/// Caches a third-party bearer token and refreshes it on demand.
///
/// The cached slot sits behind one async mutex that is held across the
/// exchange call, so at most one refresh is in flight per cache instance;
/// concurrent callers wait on the lock and reuse the fresh token. A failed
/// refresh leaves the cached state untouched.
pub struct TokenCache {
    exchanger: Arc<dyn TokenExchanger>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            exchanger,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first when it is absent or
    /// within the safety margin of its expiry.
    pub async fn get_token(&self) -> Result<String, SageError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.secret.clone());
            }
        }

        let fresh = self.exchanger.exchange().await?;
        let lifetime =
            Duration::seconds(fresh.expires_in_secs as i64 - EXPIRY_SAFETY_MARGIN_SECS);
        let expires_at = Utc::now() + lifetime;
        debug!(%expires_at, "bearer token refreshed");
        let secret = fresh.secret.clone();
        *slot = Some(CachedToken {
            secret: fresh.secret,
            expires_at,
        });
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use screensage_core::ExchangedToken;

    struct CountingExchanger {
        calls: AtomicUsize,
        ttl_secs: u64,
        fail: bool,
        delay: Option<StdDuration>,
    }

    impl CountingExchanger {
        fn new(ttl_secs: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                ttl_secs,
                fail: false,
                delay: None,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(3600)
            }
        }

        fn with_delay(mut self, delay: StdDuration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange(&self) -> Result<ExchangedToken, SageError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(SageError::Credential("exchange refused".to_string()));
            }
            Ok(ExchangedToken {
                secret: format!("token-{}", n),
                expires_in_secs: self.ttl_secs,
            })
        }
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let exchanger = Arc::new(CountingExchanger::new(3600));
        let cache = TokenCache::new(exchanger.clone());

        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_within_safety_margin_is_refreshed() {
        // ttl equal to the margin means the token expires immediately
        let exchanger = Arc::new(CountingExchanger::new(60));
        let cache = TokenCache::new(exchanger.clone());

        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-2");
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let exchanger =
            Arc::new(CountingExchanger::new(3600).with_delay(StdDuration::from_millis(50)));
        let cache = Arc::new(TokenCache::new(exchanger.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_token().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_credential_error() {
        let exchanger = Arc::new(CountingExchanger::failing());
        let cache = TokenCache::new(exchanger.clone());

        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, SageError::Credential(_)));
        // a failure caches nothing, the next call tries again
        assert!(cache.get_token().await.is_err());
        assert_eq!(exchanger.calls(), 2);
    }
}
