use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Role;
use crate::repos::PlatformStore;
use crate::services::claims::{
    ClaimKind, ClaimShape, LtiMessage, LtiModule, MessageScope, PopulateError, Populator,
    RegistryBuilder, RegistryError,
};
use crate::services::lti::RESOURCE_LINK_REQUEST;

pub const TARGET_LINK_URI: &str = "https://purl.imsglobal.org/spec/lti/claim/target_link_uri";
pub const RESOURCE_LINK: &str = "https://purl.imsglobal.org/spec/lti/claim/resource_link";
pub const ROLE_SCOPE_MENTOR: &str = "https://purl.imsglobal.org/spec/lti/claim/role_scope_mentor";

/// `LtiResourceLinkRequest` claims.
pub struct ResourceLinkModule {
    store: Arc<dyn PlatformStore>,
}

impl ResourceLinkModule {
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self { store }
    }
}

impl LtiModule for ResourceLinkModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        registry
            .register(
                RESOURCE_LINK_REQUEST,
                ClaimShape::new("ResourceLinkLaunch")
                    .field(TARGET_LINK_URI, ClaimKind::String)
                    .field(RESOURCE_LINK, ClaimKind::Object),
                Arc::new(ResourceLinkPopulator),
            )?
            .register(
                RESOURCE_LINK_REQUEST,
                ClaimShape::new("MentorScope").field(ROLE_SCOPE_MENTOR, ClaimKind::Array),
                Arc::new(MentorScopePopulator {
                    store: self.store.clone(),
                }),
            )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ResourceLinkClaim<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

struct ResourceLinkPopulator;

#[async_trait]
impl Populator for ResourceLinkPopulator {
    fn name(&self) -> &'static str {
        "resource_link"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        message.set(TARGET_LINK_URI, scope.tool.launch_url.as_str())?;

        if let Some(link) = &scope.resource_link {
            message.set_json(
                RESOURCE_LINK,
                &ResourceLinkClaim {
                    id: &link.id,
                    title: link.title.as_deref(),
                    description: link.description.as_deref(),
                },
            )?;
        }
        Ok(())
    }
}

/// Users the launching mentor is responsible for in the context.
struct MentorScopePopulator {
    store: Arc<dyn PlatformStore>,
}

#[async_trait]
impl Populator for MentorScopePopulator {
    fn name(&self) -> &'static str {
        "role_scope_mentor"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        if scope.user.anonymous {
            return Ok(());
        }
        let Some(context_id) = scope.context_id() else {
            return Ok(());
        };
        let user_id = scope.user.user.id.as_str();

        let is_mentor = self
            .store
            .get_membership(context_id, user_id)
            .await?
            .is_some_and(|m| m.has_role(Role::Mentor));
        if !is_mentor {
            return Ok(());
        }

        let mentees = self.store.get_mentees(context_id, user_id).await?;
        if !mentees.is_empty() {
            message.set(ROLE_SCOPE_MENTOR, mentees)?;
        }
        Ok(())
    }
}
