use std::sync::Arc;

use jsonwebtoken::{Algorithm, Header};
use serde::Serialize;
use tracing::error;

use crate::error::AppError;
use crate::services::auth::keys::KeyStore;

/// RS256 signer for ID tokens and service access tokens.
///
/// The key is fetched from the [`KeyStore`] for every token.
#[derive(Clone)]
pub struct JwtIssuer {
    issuer: String,
    keys: Arc<dyn KeyStore>,
}

impl JwtIssuer {
    pub fn new(issuer: String, keys: Arc<dyn KeyStore>) -> Self {
        Self { issuer, keys }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub async fn sign<T: Serialize + Sync>(&self, claims: &T) -> Result<String, AppError> {
        let key = self.keys.signing_key().await.map_err(|e| {
            error!(error = %e, "failed to load platform signing key");
            AppError::Internal
        })?;

        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(key.kid);

        jsonwebtoken::encode(&header, claims, &key.key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            AppError::Internal
        })
    }
}
