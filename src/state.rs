/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - authorize: 起動 (OIDC 認可) フロー, token: client_credentials, keys: JWKS 公開用
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::{AuthorizationService, KeyStore, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub authorize: Arc<AuthorizationService>,
    pub token: Arc<TokenService>,
    pub keys: Arc<dyn KeyStore>,
}

impl AppState {
    pub fn new(
        authorize: Arc<AuthorizationService>,
        token: Arc<TokenService>,
        keys: Arc<dyn KeyStore>,
    ) -> Self {
        Self {
            authorize,
            token,
            keys,
        }
    }
}
