use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use chrono::Utc;

use crate::domain::ServiceToken;
use crate::services::{
    auth::replay::store::{ReplayError, ServiceTokenStore},
    cache::{CacheClient, MemoryCache, ValkeyClient},
};

/// Replay store on top of a [`CacheClient`] (Valkey in production, in-memory for tests).
///
/// The record lives as long as the assertion it guards can still be accepted;
/// the cache's own expiry makes an expired `jti` usable again.
#[derive(Clone)]
pub struct CacheReplayStore<C: CacheClient> {
    cache: Arc<C>,
    // Optional key prefix to avoid collisions across environments
    prefix: String,
}

impl CacheReplayStore<ValkeyClient> {
    pub async fn valkey(redis_url: &str) -> Result<Self, ReplayError> {
        let client = ValkeyClient::new(redis_url).await?;
        Ok(Self::new_with_cache(Arc::new(client), "lti:jti"))
    }
}

impl CacheReplayStore<MemoryCache> {
    pub fn in_memory() -> Self {
        Self::new_with_cache(Arc::new(MemoryCache::new()), "lti:jti")
    }
}

impl<C: CacheClient> CacheReplayStore<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    /// `prefix:<len>:<tool>:<jti>`; the length keeps ids containing `:` apart.
    pub fn key(&self, token: &ServiceToken) -> String {
        format!(
            "{}:{}:{}:{}",
            self.prefix,
            token.tool_client_id.len(),
            token.tool_client_id,
            token.jti
        )
    }
}

impl<C: CacheClient> ServiceTokenStore for CacheReplayStore<C> {
    fn check_and_store<'a>(
        &'a self,
        token: &'a ServiceToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, ReplayError>> + Send + 'a>> {
        Box::pin(async move {
            let full_key = self.key(token);
            let remaining = (token.expires_at - Utc::now()).num_seconds().max(1) as u64;

            // SET <key> "1" NX EX <ttl>
            let stored = self
                .cache
                .set_if_absent_with_ttl(&full_key, "1", Duration::from_secs(remaining))
                .await?;

            tracing::debug!(
                backend = self.cache.backend_name(),
                client_id = %token.tool_client_id,
                first_use = stored,
                "jti replay check"
            );
            Ok(stored)
        })
    }
}
