//! Platform signing key and the public JWKS derived from it.
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    EncodingKey,
    jwk::{
        AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
        RSAKeyParameters, RSAKeyType,
    },
};
use rsa::{
    RsaPrivateKey, pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid RSA private key PEM: {0}")]
    InvalidPem(String),
}

/// Private key material used for one signing operation.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub key: EncodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SigningKey").field("kid", &self.kid).finish()
    }
}

/// Key port. Read on every signing request; rotation and caching belong to the implementation.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn signing_key(&self) -> Result<SigningKey, KeyError>;

    async fn key_set(&self) -> Result<JwkSet, KeyError>;
}

/// Single RSA key loaded from PEM at startup.
pub struct PemKeyStore {
    signing: SigningKey,
    public: Jwk,
}

impl PemKeyStore {
    /// Accepts PKCS#8 or PKCS#1 PEM. `kid` defaults to the RFC 7638 thumbprint.
    pub fn from_pem(pem: &str, kid: Option<String>) -> Result<Self, KeyError> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| KeyError::InvalidPem(e.to_string()))?;
        let public = private.to_public_key();

        let n = URL_SAFE_NO_PAD.encode(public.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public.e().to_bytes_be());
        let kid = kid.unwrap_or_else(|| thumbprint(&n, &e));

        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| KeyError::InvalidPem(e.to_string()))?;

        Ok(Self {
            signing: SigningKey {
                kid: kid.clone(),
                key,
            },
            public: Jwk {
                common: CommonParameters {
                    public_key_use: Some(PublicKeyUse::Signature),
                    key_algorithm: Some(KeyAlgorithm::RS256),
                    key_id: Some(kid),
                    ..CommonParameters::default()
                },
                algorithm: AlgorithmParameters::RSA(RSAKeyParameters {
                    key_type: RSAKeyType::RSA,
                    n,
                    e,
                }),
            },
        })
    }

    pub fn kid(&self) -> &str {
        &self.signing.kid
    }
}

#[async_trait]
impl KeyStore for PemKeyStore {
    async fn signing_key(&self) -> Result<SigningKey, KeyError> {
        Ok(self.signing.clone())
    }

    async fn key_set(&self) -> Result<JwkSet, KeyError> {
        Ok(JwkSet {
            keys: vec![self.public.clone()],
        })
    }
}

/// RFC 7638 SHA-256 thumbprint. Members must be in lexicographic order with no whitespace.
fn thumbprint(n: &str, e: &str) -> String {
    let canonical = format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn key_set_publishes_rs256_signing_key() {
        let store = PemKeyStore::from_pem(test_support::platform_key_pem(), None).unwrap();
        let jwks = store.key_set().await.unwrap();

        assert_eq!(jwks.keys.len(), 1);
        let key = &jwks.keys[0];
        assert_eq!(key.common.public_key_use, Some(PublicKeyUse::Signature));
        assert_eq!(key.common.key_algorithm, Some(KeyAlgorithm::RS256));
        let AlgorithmParameters::RSA(rsa) = &key.algorithm else {
            panic!("expected an RSA key, got {:?}", key.algorithm);
        };
        assert_eq!(rsa.e, "AQAB");
        let kid = key.common.key_id.as_deref().unwrap();
        assert_eq!(kid, thumbprint(&rsa.n, &rsa.e));
        assert_eq!(store.signing_key().await.unwrap().kid, kid);

        let json = serde_json::to_value(&jwks).unwrap();
        assert_eq!(json["keys"][0]["kty"], "RSA");
        assert_eq!(json["keys"][0]["use"], "sig");
        assert_eq!(json["keys"][0]["alg"], "RS256");
    }

    #[test]
    fn explicit_kid_wins() {
        let store =
            PemKeyStore::from_pem(test_support::platform_key_pem(), Some("k1".into())).unwrap();
        assert_eq!(store.kid(), "k1");
    }

    #[test]
    fn garbage_pem_is_rejected() {
        assert!(matches!(
            PemKeyStore::from_pem("not a key", None),
            Err(KeyError::InvalidPem(_))
        ));
    }
}
