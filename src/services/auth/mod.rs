pub mod authorize;
pub mod client_assertion;
pub mod factory;
pub mod jwt;
pub mod keys;
pub mod replay;
pub mod token_service;
pub mod tool_keys;

pub use authorize::{AuthorizationRequest, AuthorizationService, LaunchResponse};
pub use jwt::JwtIssuer;
pub use keys::{KeyStore, PemKeyStore};
pub use token_service::{IssuedAccessToken, TokenRequest, TokenService};
pub use tool_keys::ToolKeyResolver;
