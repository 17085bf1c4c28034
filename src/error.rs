/*
 * Responsibility
 * - OAuth2 / OIDC のプロトコルエラー (error, error_description, error_uri) → 400
 * - プロセスレベルのエラー (設定 / レジストリ構成 / 内部障害) → 500
 * - RepoError / RegistryError などからの変換 (fail-closed)
 */
use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::repos::RepoError;
use crate::services::claims::{PopulateError, RegistryError};

/// Anchors quoted in `error_uri`.
pub mod error_uri {
    pub const AUTHENTICATION_REQUEST: &str =
        "https://www.imsglobal.org/spec/security/v1p0/#step-2-authentication-request";
    pub const AUTHENTICATION_RESPONSE: &str =
        "https://www.imsglobal.org/spec/security/v1p0/#step-3-authentication-response";
    pub const CLIENT_CREDENTIALS: &str = "https://www.imsglobal.org/spec/security/v1p0/#using-json-web-tokens-with-oauth-2-0-client-credentials-grant";
    pub const TOKEN_ERROR_RESPONSE: &str = "https://datatracker.ietf.org/doc/html/rfc6749#section-5.2";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
}

impl OAuthErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol rejection. Always terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthError {
    pub code: OAuthErrorCode,
    pub description: String,
    pub uri: Option<&'static str>,
}

impl OAuthError {
    pub fn new(code: OAuthErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            uri: None,
        }
    }

    pub fn with_uri(mut self, uri: &'static str) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidRequest, description)
    }

    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidClient, description)
    }

    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidGrant, description)
    }

    pub fn unauthorized_client(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::UnauthorizedClient, description)
    }

    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::UnsupportedGrantType, description)
    }

    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::new(OAuthErrorCode::InvalidScope, description)
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl std::error::Error for OAuthError {}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<&'static str>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Registry misuse or an unregistered message type. A programming error in the host.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::OAuth(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: e.code.as_str(),
                    error_description: e.description,
                    error_uri: e.uri,
                },
            ),
            AppError::Config(_) | AppError::Configuration(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "server_error",
                    error_description: "internal server error".into(),
                    error_uri: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        error!(error = %e, "platform store failure");
        AppError::Internal
    }
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        error!(error = %e, "claims registry misconfigured");
        AppError::Configuration(e.to_string())
    }
}

impl From<PopulateError> for AppError {
    fn from(e: PopulateError) -> Self {
        match e {
            PopulateError::Claim(e) => {
                error!(error = %e, "populator wrote an invalid claim");
                AppError::Configuration(e.to_string())
            }
            PopulateError::Store(e) => e.into(),
            PopulateError::Substitution(e) => {
                error!(error = %e, "custom parameter substitution failed");
                AppError::Internal
            }
        }
    }
}
