//! Claims shared by every launch message: context, roles, tool platform,
//! launch presentation and the substituted custom parameters.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::Role;
use crate::repos::PlatformStore;
use crate::services::claims::{
    ClaimKind, ClaimShape, LtiMessage, LtiModule, MessageScope, PopulateError, Populator,
    RegistryBuilder, RegistryError,
};
use crate::services::custom;
use crate::services::lti::{DEEP_LINKING_REQUEST, RESOURCE_LINK_REQUEST};

pub const CONTEXT: &str = "https://purl.imsglobal.org/spec/lti/claim/context";
pub const ROLES: &str = "https://purl.imsglobal.org/spec/lti/claim/roles";
pub const TOOL_PLATFORM: &str = "https://purl.imsglobal.org/spec/lti/claim/tool_platform";
pub const LAUNCH_PRESENTATION: &str =
    "https://purl.imsglobal.org/spec/lti/claim/launch_presentation";
pub const CUSTOM: &str = "https://purl.imsglobal.org/spec/lti/claim/custom";

const INSTITUTION_ADMINISTRATOR: &str =
    "http://purl.imsglobal.org/vocab/lis/v2/institution/person#Administrator";
const COURSE_OFFERING: &str = "http://purl.imsglobal.org/vocab/lis/v2/course#CourseOffering";

pub struct CommonLaunchModule {
    store: Arc<dyn PlatformStore>,
}

impl CommonLaunchModule {
    pub fn new(store: Arc<dyn PlatformStore>) -> Self {
        Self { store }
    }
}

impl LtiModule for CommonLaunchModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        for message_type in [RESOURCE_LINK_REQUEST, DEEP_LINKING_REQUEST] {
            registry
                .register(
                    message_type,
                    ClaimShape::new("Context").field(CONTEXT, ClaimKind::Object),
                    Arc::new(ContextPopulator),
                )?
                .register(
                    message_type,
                    ClaimShape::new("Roles").field(ROLES, ClaimKind::Array),
                    Arc::new(RolesPopulator {
                        store: self.store.clone(),
                    }),
                )?
                .register(
                    message_type,
                    ClaimShape::new("ToolPlatform").field(TOOL_PLATFORM, ClaimKind::Object),
                    Arc::new(ToolPlatformPopulator {
                        store: self.store.clone(),
                    }),
                )?
                .register(
                    message_type,
                    ClaimShape::new("LaunchPresentation")
                        .field(LAUNCH_PRESENTATION, ClaimKind::Object),
                    Arc::new(LaunchPresentationPopulator),
                )?
                .register(
                    message_type,
                    ClaimShape::new("Custom").field(CUSTOM, ClaimKind::Object),
                    Arc::new(CustomPopulator {
                        store: self.store.clone(),
                    }),
                )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ContextClaim<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(rename = "type")]
    types: Vec<&'a str>,
}

struct ContextPopulator;

#[async_trait]
impl Populator for ContextPopulator {
    fn name(&self) -> &'static str {
        "context"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let Some(context) = &scope.context else {
            return Ok(());
        };

        let types = if context.types.is_empty() {
            vec![COURSE_OFFERING]
        } else {
            context.types.iter().map(String::as_str).collect()
        };

        message.set_json(
            CONTEXT,
            &ContextClaim {
                id: &context.id,
                label: context.label.as_deref(),
                title: context.title.as_deref(),
                types,
            },
        )?;
        Ok(())
    }
}

struct RolesPopulator {
    store: Arc<dyn PlatformStore>,
}

#[async_trait]
impl Populator for RolesPopulator {
    fn name(&self) -> &'static str {
        "roles"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let mut roles: Vec<&'static str> = Vec::new();

        if let Some(context_id) = scope.context_id() {
            if let Some(membership) = self
                .store
                .get_membership(context_id, &scope.user.user.id)
                .await?
            {
                roles.extend(membership.roles.iter().map(|r| r.uri()));
                if membership.has_role(Role::Administrator) {
                    roles.push(INSTITUTION_ADMINISTRATOR);
                }
            }
        }

        message.set(
            ROLES,
            Value::Array(roles.into_iter().map(Value::from).collect()),
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ToolPlatformClaim<'a> {
    guid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_family_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

struct ToolPlatformPopulator {
    store: Arc<dyn PlatformStore>,
}

#[async_trait]
impl Populator for ToolPlatformPopulator {
    fn name(&self) -> &'static str {
        "tool_platform"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        _scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let Some(p) = self.store.get_platform().await? else {
            return Ok(());
        };

        message.set_json(
            TOOL_PLATFORM,
            &ToolPlatformClaim {
                guid: &p.guid,
                name: p.name.as_deref(),
                description: p.description.as_deref(),
                url: p.url.as_deref(),
                contact_email: p.contact_email.as_deref(),
                product_family_code: p.product_family_code.as_deref(),
                version: p.version.as_deref(),
            },
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct LaunchPresentationClaim<'a> {
    document_target: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<&'a str>,
}

struct LaunchPresentationPopulator;

#[async_trait]
impl Populator for LaunchPresentationPopulator {
    fn name(&self) -> &'static str {
        "launch_presentation"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        // Same gate as the top-level profile claim.
        let locale = if scope.tool.disclosure.locale && !scope.user.anonymous {
            scope.user.user.locale.as_deref()
        } else {
            None
        };

        message.set_json(
            LAUNCH_PRESENTATION,
            &LaunchPresentationClaim {
                document_target: "iframe",
                locale,
            },
        )?;
        Ok(())
    }
}

struct CustomPopulator {
    store: Arc<dyn PlatformStore>,
}

#[async_trait]
impl Populator for CustomPopulator {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let custom = custom::substitute(self.store.as_ref(), scope).await?;
        if !custom.is_empty() {
            message.set_json(CUSTOM, &custom)?;
        }
        Ok(())
    }
}
