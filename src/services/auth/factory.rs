/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::repos::PlatformStore;
use crate::services::auth::{
    AuthorizationService, JwtIssuer, KeyStore, PemKeyStore, TokenService, ToolKeyResolver,
    client_assertion::ClientAssertionValidator,
    replay::{CacheReplayStore, PgServiceTokenStore, ServiceTokenStore},
};
use crate::services::claims::Registry;
use crate::services::lti::ServiceUrls;

pub fn build_key_store(config: &Config) -> Result<Arc<dyn KeyStore>, AppError> {
    let keys = PemKeyStore::from_pem(&config.signing_key_pem, config.signing_key_id.clone())
        .map_err(|e| {
            error!(error = %e, "failed to load LTI_SIGNING_KEY_PEM");
            AppError::Internal
        })?;
    info!(kid = %keys.kid(), "platform signing key loaded");
    Ok(Arc::new(keys))
}

/// Valkey when `VALKEY_URL` is set, otherwise the `service_tokens` table.
pub async fn build_replay_store(
    config: &Config,
    pool: PgPool,
) -> Result<Arc<dyn ServiceTokenStore>, AppError> {
    match &config.valkey_url {
        Some(url) => {
            let store = CacheReplayStore::valkey(url).await.map_err(|e| {
                error!(error = %e, "failed to connect to valkey");
                AppError::Internal
            })?;
            info!(backend = "valkey", "jti replay store ready");
            Ok(Arc::new(store))
        }
        None => {
            info!(backend = "postgres", "jti replay store ready");
            Ok(Arc::new(PgServiceTokenStore::new(pool)))
        }
    }
}

pub fn build_authorization_service(
    config: &Config,
    store: Arc<dyn PlatformStore>,
    registry: Arc<Registry>,
    keys: Arc<dyn KeyStore>,
) -> AuthorizationService {
    AuthorizationService::new(
        store,
        registry,
        JwtIssuer::new(config.issuer.clone(), keys),
        config.id_token_ttl_seconds,
    )
}

pub fn build_token_service(
    config: &Config,
    store: Arc<dyn PlatformStore>,
    replay: Arc<dyn ServiceTokenStore>,
    keys: Arc<dyn KeyStore>,
) -> Result<TokenService, AppError> {
    let audience = config
        .token_audience
        .clone()
        .unwrap_or_else(|| ServiceUrls::new(&config.public_base_url).token_endpoint());

    let tool_keys = ToolKeyResolver::new(config.tool_jwks_timeout).map_err(|e| {
        error!(error = %e, "failed to build HTTP client for tool key sets");
        AppError::Internal
    })?;

    Ok(TokenService::new(
        store,
        tool_keys,
        ClientAssertionValidator::new(audience, config.assertion_leeway_seconds),
        replay,
        JwtIssuer::new(config.issuer.clone(), keys),
        config.access_token_ttl_seconds,
    ))
}
