use serde::{Deserialize, Serialize};

use crate::services::auth::{IssuedAccessToken, TokenRequest};

/// Form body for `/lti/token`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub client_assertion_type: Option<String>,
    pub client_assertion: Option<String>,
    pub scope: Option<String>,
}

impl From<TokenParams> for TokenRequest {
    fn from(p: TokenParams) -> Self {
        Self {
            grant_type: p.grant_type,
            client_assertion_type: p.client_assertion_type,
            client_assertion: p.client_assertion,
            scope: p.scope,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
    /// Granted scopes, space separated.
    pub scope: String,
}

impl From<IssuedAccessToken> for TokenResponse {
    fn from(t: IssuedAccessToken) -> Self {
        Self {
            access_token: t.access_token,
            token_type: t.token_type,
            expires_in: t.expires_in,
            scope: t.scope,
        }
    }
}
