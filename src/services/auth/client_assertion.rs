//! RFC 7523 JWT-bearer client assertions.
//!
//! Two phases: [`peek`] reads the claims without checking the signature so the
//! tool can be identified, then [`ClientAssertionValidator::validate`] verifies
//! the signature and registered claims against that tool's keys.
use std::{error::Error as StdError, fmt};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation,
    jwk::{AlgorithmParameters, JwkSet},
};
use serde::Deserialize;

pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug)]
pub enum AssertionError {
    Malformed(&'static str),
    Jwt(jsonwebtoken::errors::Error),
    NoMatchingKey,
    EmptyClaim(&'static str),
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(why) => write!(f, "malformed client assertion: {}", why),
            Self::Jwt(e) => write!(f, "client assertion verification failed: {}", e),
            Self::NoMatchingKey => write!(f, "no key in the tool's key set matches the assertion"),
            Self::EmptyClaim(name) => write!(f, "client assertion is missing '{}'", name),
        }
    }
}

impl StdError for AssertionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AssertionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Claims read from an assertion before its signature has been checked.
/// Nothing here may be trusted beyond picking the tool.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Claims of an assertion whose signature, issuer, audience and expiry were verified.
#[derive(Debug, Clone, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    // Validation handles audience checks; string or array.
    #[serde(default)]
    pub aud: serde_json::Value,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

pub fn peek(token: &str) -> Result<UnverifiedClaims, AssertionError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AssertionError::Malformed("expected three segments"));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AssertionError::Malformed("payload is not base64url"))?;

    serde_json::from_slice(&bytes).map_err(|_| AssertionError::Malformed("payload is not JSON"))
}

#[derive(Debug, Clone)]
pub struct ClientAssertionValidator {
    audience: String,
    leeway_seconds: u64,
}

impl ClientAssertionValidator {
    pub fn new(audience: impl Into<String>, leeway_seconds: u64) -> Self {
        Self {
            audience: audience.into(),
            leeway_seconds,
        }
    }

    /// Seconds an assertion is still accepted after its `exp`.
    pub fn leeway_seconds(&self) -> u64 {
        self.leeway_seconds
    }

    fn validation(&self, client_id: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[client_id]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
        validation.leeway = self.leeway_seconds;
        validation
    }

    /// Verify the assertion against the tool's keys.
    ///
    /// With a `kid` header only that key is tried; without one every RSA key is.
    pub fn validate(
        &self,
        token: &str,
        keys: &JwkSet,
        client_id: &str,
    ) -> Result<AssertionClaims, AssertionError> {
        let header = jsonwebtoken::decode_header(token)?;
        let validation = self.validation(client_id);

        let candidates: Vec<_> = match header.kid.as_deref() {
            Some(kid) => keys.find(kid).into_iter().collect(),
            None => keys
                .keys
                .iter()
                .filter(|k| matches!(k.algorithm, AlgorithmParameters::RSA(_)))
                .collect(),
        };
        if candidates.is_empty() {
            return Err(AssertionError::NoMatchingKey);
        }

        let mut last_err = AssertionError::NoMatchingKey;
        for jwk in candidates {
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    last_err = e.into();
                    continue;
                }
            };
            match jsonwebtoken::decode::<AssertionClaims>(token, &key, &validation) {
                Ok(data) => return Self::check(data.claims),
                Err(e) => last_err = e.into(),
            }
        }
        Err(last_err)
    }

    fn check(claims: AssertionClaims) -> Result<AssertionClaims, AssertionError> {
        if claims.sub.trim().is_empty() {
            return Err(AssertionError::EmptyClaim("sub"));
        }
        if claims.jti.as_deref().is_none_or(|j| j.trim().is_empty()) {
            return Err(AssertionError::EmptyClaim("jti"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestAssertion};

    const AUD: &str = "https://lms.example/api/v1/lti/token";

    fn validator() -> ClientAssertionValidator {
        ClientAssertionValidator::new(AUD, 0)
    }

    #[test]
    fn peek_reads_unverified_claims() {
        let token = test_support::client_assertion(&TestAssertion::new("tool-1", AUD));
        let claims = peek(&token).unwrap();
        assert_eq!(claims.iss.as_deref(), Some("tool-1"));
        assert_eq!(claims.sub.as_deref(), Some("tool-1"));
    }

    #[test]
    fn peek_rejects_garbage() {
        assert!(matches!(peek("a.b"), Err(AssertionError::Malformed(_))));
        assert!(matches!(peek("a.!!!.c"), Err(AssertionError::Malformed(_))));
    }

    #[test]
    fn valid_assertion_verifies_against_tool_keys() {
        let token = test_support::client_assertion(&TestAssertion::new("tool-1", AUD));
        let claims = validator()
            .validate(&token, &test_support::tool_jwks(), "tool-1")
            .unwrap();
        assert_eq!(claims.sub, "tool-1");
        assert!(claims.jti.is_some());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = test_support::client_assertion(&TestAssertion::new(
            "tool-1",
            "https://elsewhere.example/token",
        ));
        let err = validator()
            .validate(&token, &test_support::tool_jwks(), "tool-1")
            .unwrap_err();
        assert!(matches!(err, AssertionError::Jwt(_)));
    }

    #[test]
    fn key_from_another_party_is_rejected() {
        let token = test_support::client_assertion(&TestAssertion::new("tool-1", AUD));
        let err = validator()
            .validate(&token, &test_support::platform_jwks(), "tool-1")
            .unwrap_err();
        assert!(matches!(
            err,
            AssertionError::NoMatchingKey | AssertionError::Jwt(_)
        ));
    }

    #[test]
    fn missing_jti_is_rejected() {
        let mut assertion = TestAssertion::new("tool-1", AUD);
        assertion.jti = None;
        let token = test_support::client_assertion(&assertion);
        let err = validator()
            .validate(&token, &test_support::tool_jwks(), "tool-1")
            .unwrap_err();
        assert!(matches!(err, AssertionError::EmptyClaim("jti")));
    }
}
