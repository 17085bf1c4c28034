use serde::Deserialize;

use crate::services::auth::AuthorizationRequest;

/// OIDC authentication request, from the query string (GET) or a form body (POST).
///
/// Every field is optional here; presence and values are checked by the service
/// so each failure maps to its own protocol error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    pub scope: Option<String>,
    pub response_type: Option<String>,
    pub response_mode: Option<String>,
    pub prompt: Option<String>,
    pub nonce: Option<String>,
    pub state: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub login_hint: Option<String>,
    pub lti_message_hint: Option<String>,
}

impl From<AuthorizeParams> for AuthorizationRequest {
    fn from(p: AuthorizeParams) -> Self {
        Self {
            scope: p.scope,
            response_type: p.response_type,
            response_mode: p.response_mode,
            prompt: p.prompt,
            nonce: p.nonce,
            state: p.state,
            client_id: p.client_id,
            redirect_uri: p.redirect_uri,
            login_hint: p.login_hint,
            lti_message_hint: p.lti_message_hint,
        }
    }
}
