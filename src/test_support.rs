//! Key fixtures and assertion builders shared by unit tests.
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, jwk::JwkSet};
use rsa::{RsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub const TOOL_KID: &str = "tool-key-1";
pub const PLATFORM_KID: &str = "platform-key-1";

pub fn platform_key_pem() -> &'static str {
    include_str!("../tests/fixtures/platform_key.pem")
}

pub fn tool_key_pem() -> &'static str {
    include_str!("../tests/fixtures/tool_key.pem")
}

fn jwks(pem: &str, kid: &str) -> JwkSet {
    let key = RsaPrivateKey::from_pkcs8_pem(pem).unwrap();
    let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
    serde_json::from_value(json!({
        "keys": [{ "kty": "RSA", "use": "sig", "alg": "RS256", "kid": kid, "n": n, "e": e }]
    }))
    .unwrap()
}

pub fn tool_jwks() -> JwkSet {
    jwks(tool_key_pem(), TOOL_KID)
}

pub fn platform_jwks() -> JwkSet {
    jwks(platform_key_pem(), PLATFORM_KID)
}

#[derive(Debug, Clone, Serialize)]
pub struct TestAssertion {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(skip)]
    pub kid: Option<String>,
}

impl TestAssertion {
    /// Self-issued by `client_id`, valid for five minutes.
    pub fn new(client_id: &str, aud: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: aud.to_string(),
            iat: now,
            exp: now + 300,
            jti: Some(Uuid::new_v4().to_string()),
            kid: Some(TOOL_KID.to_string()),
        }
    }
}

/// RS256 client assertion signed with the tool fixture key.
pub fn client_assertion(assertion: &TestAssertion) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = assertion.kid.clone();
    let key = EncodingKey::from_rsa_pem(tool_key_pem().as_bytes()).unwrap();
    jsonwebtoken::encode(&header, assertion, &key).unwrap()
}
