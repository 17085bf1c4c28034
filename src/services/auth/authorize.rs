//! OIDC authentication request handling for LTI launches (`form_post` response mode).
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{Context, DisclosurePermissions, ResourceLink, User};
use crate::error::{AppError, OAuthError, error_uri};
use crate::repos::PlatformStore;
use crate::services::auth::jwt::JwtIssuer;
use crate::services::claims::{
    ClaimError, LtiMessage, MessageScope, Registry, UserScope, names,
};
use crate::services::hints::{LoginHint, MessageHint};

/// Parameters of the authentication request, as received.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequest {
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

/// A signed launch ready to be auto-posted to the tool.
#[derive(Debug, Clone)]
pub struct LaunchResponse {
    pub redirect_uri: String,
    pub id_token: String,
    pub state: Option<String>,
}

pub struct AuthorizationService {
    store: Arc<dyn PlatformStore>,
    registry: Arc<Registry>,
    jwt: JwtIssuer,
    id_token_ttl_seconds: u64,
}

fn reject(err: OAuthError) -> AppError {
    AppError::OAuth(err.with_uri(error_uri::AUTHENTICATION_REQUEST))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl AuthorizationService {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        registry: Arc<Registry>,
        jwt: JwtIssuer,
        id_token_ttl_seconds: u64,
    ) -> Self {
        Self {
            store,
            registry,
            jwt,
            id_token_ttl_seconds,
        }
    }

    pub async fn authorize(&self, req: &AuthorizationRequest) -> Result<LaunchResponse, AppError> {
        let result = self.launch(req).await;
        if let Err(AppError::OAuth(e)) = &result {
            warn!(
                error = %e.code,
                description = %e.description,
                client_id = req.client_id.as_deref().unwrap_or_default(),
                "authorization request rejected"
            );
        }
        result
    }

    async fn launch(&self, req: &AuthorizationRequest) -> Result<LaunchResponse, AppError> {
        // 1. Fixed OIDC parameters.
        if req.scope.as_deref() != Some("openid") {
            return Err(reject(OAuthError::invalid_scope("scope must be 'openid'.")));
        }
        if req.response_type.as_deref() != Some("id_token") {
            return Err(reject(OAuthError::invalid_request(
                "response_type must be 'id_token'.",
            )));
        }
        if req.response_mode.as_deref() != Some("form_post") {
            return Err(reject(OAuthError::invalid_request(
                "response_mode must be 'form_post'.",
            )));
        }
        if req.prompt.as_deref() != Some("none") {
            return Err(reject(OAuthError::invalid_request("prompt must be 'none'.")));
        }
        let nonce = present(&req.nonce)
            .ok_or_else(|| reject(OAuthError::invalid_request("nonce is required.")))?;
        let login_hint = present(&req.login_hint)
            .ok_or_else(|| reject(OAuthError::invalid_request("login_hint is required.")))?;
        let client_id = present(&req.client_id)
            .ok_or_else(|| reject(OAuthError::invalid_client("client_id is required.")))?;

        // 2. Tool and redirect URI.
        let tool = self
            .store
            .get_tool(client_id)
            .await?
            .ok_or_else(|| reject(OAuthError::invalid_client("client_id is not registered.")))?;
        let redirect_uri = present(&req.redirect_uri)
            .filter(|uri| tool.accepts_redirect_uri(uri))
            .ok_or_else(|| {
                reject(OAuthError::invalid_grant(
                    "redirect_uri is not registered for this client.",
                ))
            })?;

        // 3. Message hint.
        let message_hint = present(&req.lti_message_hint)
            .and_then(|raw| MessageHint::decode(raw).ok())
            .ok_or_else(|| reject(OAuthError::invalid_request("lti_message_hint is invalid.")))?;

        // 4. Deployment must belong to the authenticated tool.
        let deployment = self
            .store
            .get_deployment(&message_hint.deployment_id)
            .await?
            .filter(|d| d.tool_client_id == tool.client_id)
            .ok_or_else(|| {
                reject(OAuthError::invalid_request(
                    "deployment does not belong to this client.",
                ))
            })?;

        // 5. Users.
        let login = LoginHint::decode(login_hint)
            .map_err(|_| reject(OAuthError::invalid_request("login_hint is invalid.")))?;
        let impersonation = login.is_impersonation();
        let user = self.resolve_user(&login.user_id).await?;
        let actual_user = match login.actual_user_id.as_deref() {
            Some(id) => Some(self.resolve_user(id).await?),
            None => None,
        };

        // 6. Context and resource link, fetched concurrently then cross-checked.
        let (context, resource_link) = tokio::try_join!(
            self.lookup_context(message_hint.context_id.as_deref()),
            self.lookup_resource_link(message_hint.resource_link_id.as_deref()),
        )?;
        check_containment(
            &deployment.deployment_id,
            message_hint.context_id.as_deref(),
            context.as_ref(),
            resource_link.as_ref(),
        )?;

        // 7. Scope and container.
        let scope = MessageScope {
            message_type: message_hint.message_type.clone(),
            user: UserScope {
                user,
                actual_user,
                anonymous: login.anonymous,
            },
            tool,
            deployment,
            context,
            resource_link,
            message_hint: message_hint.extra.clone(),
        };
        let mut message = self.registry.instantiate(&scope.message_type)?;

        // 8. Base and profile claims.
        self.populate_base(&mut message, &scope, nonce)
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        // 9. Feature claims.
        self.registry.populate(&mut message, &scope).await?;

        // 10. Sign.
        let id_token = self.jwt.sign(&message).await?;

        info!(
            client_id = %scope.tool.client_id,
            deployment_id = %scope.deployment.deployment_id,
            message_type = %scope.message_type,
            anonymous = scope.user.anonymous,
            impersonation,
            "LTI launch issued"
        );

        Ok(LaunchResponse {
            redirect_uri: redirect_uri.to_string(),
            id_token,
            state: req.state.clone(),
        })
    }

    async fn resolve_user(&self, user_id: &str) -> Result<User, AppError> {
        self.store.get_user(user_id).await?.ok_or_else(|| {
            AppError::OAuth(
                OAuthError::unauthorized_client("user is not known to this platform.")
                    .with_uri(error_uri::AUTHENTICATION_RESPONSE),
            )
        })
    }

    async fn lookup_context(&self, id: Option<&str>) -> Result<Option<Context>, AppError> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.store.get_context(id).await? {
            Some(context) => Ok(Some(context)),
            None => Err(reject(OAuthError::invalid_request("context not found."))),
        }
    }

    async fn lookup_resource_link(
        &self,
        id: Option<&str>,
    ) -> Result<Option<ResourceLink>, AppError> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.store.get_resource_link(id).await? {
            Some(link) => Ok(Some(link)),
            None => Err(reject(OAuthError::invalid_request(
                "resource link not found.",
            ))),
        }
    }

    fn populate_base(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
        nonce: &str,
    ) -> Result<(), ClaimError> {
        let now = Utc::now().timestamp();
        let client_id = scope.tool.client_id.as_str();

        message.set(names::ISS, self.jwt.issuer())?;
        message.set(names::AUD, client_id)?;
        message.set(names::AZP, client_id)?;
        message.set(names::IAT, now)?;
        message.set(names::EXP, now + self.id_token_ttl_seconds as i64)?;
        message.set(names::NONCE, nonce)?;
        message.set(names::DEPLOYMENT_ID, scope.deployment.deployment_id.as_str())?;

        if scope.user.anonymous {
            return Ok(());
        }
        message.set(names::SUB, scope.user.user.id.as_str())?;
        disclose(message, &scope.user.user, scope.tool.disclosure)
    }
}

/// Resource link and context must sit in the hinted deployment, and the link in the hinted context.
fn check_containment(
    deployment_id: &str,
    hinted_context_id: Option<&str>,
    context: Option<&Context>,
    link: Option<&ResourceLink>,
) -> Result<(), AppError> {
    if let Some(context) = context {
        if context.deployment_id != deployment_id {
            return Err(reject(OAuthError::invalid_request(
                "context does not belong to the deployment.",
            )));
        }
    }
    if let Some(link) = link {
        if link.deployment_id != deployment_id {
            return Err(reject(OAuthError::invalid_request(
                "resource link does not belong to the deployment.",
            )));
        }
        if hinted_context_id != Some(link.context_id.as_str()) {
            return Err(reject(OAuthError::invalid_request(
                "resource link does not belong to the context.",
            )));
        }
    }
    Ok(())
}

/// Profile claims the tool is entitled to and the user actually has.
fn disclose(
    message: &mut LtiMessage,
    user: &User,
    allowed: DisclosurePermissions,
) -> Result<(), ClaimError> {
    let fields = [
        (allowed.name, names::NAME, &user.name),
        (allowed.given_name, names::GIVEN_NAME, &user.given_name),
        (allowed.family_name, names::FAMILY_NAME, &user.family_name),
        (allowed.middle_name, names::MIDDLE_NAME, &user.middle_name),
        (allowed.email, names::EMAIL, &user.email),
        (allowed.picture, names::PICTURE, &user.picture),
        (allowed.locale, names::LOCALE, &user.locale),
    ];
    for (granted, claim, value) in fields {
        if granted {
            message.set_opt(claim, value.as_deref())?;
        }
    }
    Ok(())
}
