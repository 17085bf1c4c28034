use std::{future::Future, pin::Pin};

use crate::domain::ServiceToken;
use crate::services::cache::CacheError;

/// Replay guard for client assertion `jti`s, keyed by `(tool, jti)`.
///
/// `check_and_store` must be a single conditional write in the backend so that two
/// concurrent presentations of the same assertion cannot both succeed.
pub trait ServiceTokenStore: Send + Sync {
    // Record `token` unless an unexpired record for the same key exists.
    //
    // Returns:
    // - Ok(true)  => first use (stored)
    // - Ok(false) => replay (already used and not expired)
    // - Err(_)    => backend failure (caller must fail closed)
    fn check_and_store<'a>(
        &'a self,
        token: &'a ServiceToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, ReplayError>> + Send + 'a>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
