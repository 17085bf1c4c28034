use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::ServiceToken;
use crate::error::{AppError, OAuthError, error_uri};
use crate::repos::PlatformStore;
use crate::services::auth::{
    client_assertion::{self, CLIENT_ASSERTION_TYPE_JWT_BEARER, ClientAssertionValidator},
    jwt::JwtIssuer,
    replay::ServiceTokenStore,
    tool_keys::ToolKeyResolver,
};

/// Client-credentials token request, as received.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_assertion_type: Option<String>,
    pub client_assertion: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccessTokenClaims<'a> {
    iss: &'a str,
    aud: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
    jti: String,
    scope: &'a str,
}

/// Service-level return type to keep handlers thin.
#[derive(Clone, Debug)]
pub struct IssuedAccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub scope: String,
}

/// OAuth2 client-credentials grant with JWT-bearer client authentication.
pub struct TokenService {
    store: Arc<dyn PlatformStore>,
    tool_keys: ToolKeyResolver,
    validator: ClientAssertionValidator,
    replay: Arc<dyn ServiceTokenStore>,
    jwt: JwtIssuer,
    access_token_ttl_seconds: u64,
}

fn reject(err: OAuthError) -> AppError {
    AppError::OAuth(err.with_uri(error_uri::CLIENT_CREDENTIALS))
}

impl TokenService {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        tool_keys: ToolKeyResolver,
        validator: ClientAssertionValidator,
        replay: Arc<dyn ServiceTokenStore>,
        jwt: JwtIssuer,
        access_token_ttl_seconds: u64,
    ) -> Self {
        Self {
            store,
            tool_keys,
            validator,
            replay,
            jwt,
            access_token_ttl_seconds,
        }
    }

    pub async fn issue(&self, req: &TokenRequest) -> Result<IssuedAccessToken, AppError> {
        let result = self.client_credentials(req).await;
        if let Err(AppError::OAuth(e)) = &result {
            warn!(
                error = %e.code,
                description = %e.description,
                "token request rejected"
            );
        }
        result
    }

    async fn client_credentials(&self, req: &TokenRequest) -> Result<IssuedAccessToken, AppError> {
        // 1-3. Grant parameters.
        if req.grant_type.as_deref() != Some("client_credentials") {
            return Err(AppError::OAuth(
                OAuthError::unsupported_grant_type("grant_type must be 'client_credentials'.")
                    .with_uri(error_uri::TOKEN_ERROR_RESPONSE),
            ));
        }
        if req.client_assertion_type.as_deref() != Some(CLIENT_ASSERTION_TYPE_JWT_BEARER) {
            return Err(reject(OAuthError::invalid_grant(format!(
                "client_assertion_type must be '{CLIENT_ASSERTION_TYPE_JWT_BEARER}'."
            ))));
        }
        let requested = req
            .scope
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| reject(OAuthError::invalid_scope("scope is required.")))?;
        let assertion = req
            .client_assertion
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| reject(OAuthError::invalid_grant("client_assertion is required.")))?;

        // 4. Self-issued assertion, read before the signature is checked.
        let unverified = client_assertion::peek(assertion)
            .map_err(|e| reject(OAuthError::invalid_grant(e.to_string())))?;
        let client_id = match (unverified.iss.as_deref(), unverified.sub.as_deref()) {
            (Some(iss), Some(sub)) if !iss.is_empty() && iss == sub => iss,
            _ => {
                return Err(reject(OAuthError::invalid_grant(
                    "client assertion must be self-issued (iss == sub).",
                )));
            }
        };

        // 5. Tool with keys.
        let tool = self
            .store
            .get_tool(client_id)
            .await?
            .ok_or_else(|| reject(OAuthError::invalid_grant("client is not registered.")))?;
        if tool.key_set.is_none() {
            return Err(reject(OAuthError::invalid_grant(
                "client has no registered key set.",
            )));
        }

        // 6. Scope intersection, in request order.
        let decoded = urlencoding::decode(requested)
            .map_err(|_| reject(OAuthError::invalid_scope("scope is not valid.")))?;
        let mut granted: Vec<&str> = Vec::new();
        for s in decoded.split_whitespace() {
            if tool.has_scope(s) && !granted.contains(&s) {
                granted.push(s);
            }
        }
        if granted.is_empty() {
            return Err(reject(OAuthError::invalid_scope(
                "none of the requested scopes are granted to this client.",
            )));
        }

        // 7. Signature, issuer, audience, expiry.
        let keys = self
            .tool_keys
            .key_set(&tool)
            .await
            .map_err(|e| reject(OAuthError::invalid_request(e.to_string())))?;
        let claims = self
            .validator
            .validate(assertion, &keys, &tool.client_id)
            .map_err(|e| reject(OAuthError::invalid_request(e.to_string())))?;

        // 8. Single use. The record outlives every instant the validator
        // would still accept this assertion, leeway included.
        let accepted_until = claims
            .exp
            .saturating_add(self.validator.leeway_seconds() as i64);
        let expires_at = DateTime::<Utc>::from_timestamp(accepted_until, 0)
            .ok_or_else(|| reject(OAuthError::invalid_request("exp is out of range.")))?;
        let record = ServiceToken {
            tool_client_id: tool.client_id.clone(),
            jti: claims.jti.clone().unwrap_or_default(),
            expires_at,
        };
        let first_use = self.replay.check_and_store(&record).await.map_err(|e| {
            error!(error = %e, client_id = %tool.client_id, "replay store failure");
            AppError::Internal
        })?;
        if !first_use {
            return Err(reject(OAuthError::invalid_request(
                "jti has already been used and is not expired",
            )));
        }

        // 9. Access token.
        let scope = granted.join(" ");
        let now = Utc::now().timestamp();
        let access_token = self
            .jwt
            .sign(&AccessTokenClaims {
                iss: self.jwt.issuer(),
                aud: self.jwt.issuer(),
                sub: &claims.sub,
                iat: now,
                exp: now + self.access_token_ttl_seconds as i64,
                jti: Uuid::new_v4().to_string(),
                scope: &scope,
            })
            .await?;

        info!(client_id = %tool.client_id, scope = %scope, "service access token issued");

        Ok(IssuedAccessToken {
            access_token,
            token_type: "bearer",
            expires_in: self.access_token_ttl_seconds,
            scope,
        })
    }
}
