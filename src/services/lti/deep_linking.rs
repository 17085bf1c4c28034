use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::services::claims::{
    ClaimKind, ClaimShape, LtiMessage, LtiModule, MessageScope, PopulateError, Populator,
    RegistryBuilder, RegistryError,
};
use crate::services::lti::{DEEP_LINKING_REQUEST, ServiceUrls, resource_link::TARGET_LINK_URI};

pub const DEEP_LINKING_SETTINGS: &str =
    "https://purl.imsglobal.org/spec/lti-dl/claim/deep_linking_settings";

/// `LtiDeepLinkingRequest` claims.
pub struct DeepLinkingModule {
    urls: ServiceUrls,
}

impl DeepLinkingModule {
    pub fn new(urls: ServiceUrls) -> Self {
        Self { urls }
    }
}

impl LtiModule for DeepLinkingModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        registry.register(
            DEEP_LINKING_REQUEST,
            ClaimShape::new("DeepLinking")
                .field(TARGET_LINK_URI, ClaimKind::String)
                .field(DEEP_LINKING_SETTINGS, ClaimKind::Object),
            Arc::new(DeepLinkingPopulator {
                urls: self.urls.clone(),
            }),
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DeepLinkingSettings<'a> {
    deep_link_return_url: String,
    accept_types: [&'static str; 2],
    accept_presentation_document_targets: [&'static str; 2],
    accept_multiple: bool,
    auto_create: bool,
    /// Opaque value the tool must echo back in its response.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

struct DeepLinkingPopulator {
    urls: ServiceUrls,
}

#[async_trait]
impl Populator for DeepLinkingPopulator {
    fn name(&self) -> &'static str {
        "deep_linking_settings"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let target = scope
            .tool
            .deep_link_url
            .as_deref()
            .unwrap_or(&scope.tool.launch_url);
        message.set(TARGET_LINK_URI, target)?;

        message.set_json(
            DEEP_LINKING_SETTINGS,
            &DeepLinkingSettings {
                deep_link_return_url: self
                    .urls
                    .deep_link_return(&scope.deployment.deployment_id),
                accept_types: ["ltiResourceLink", "link"],
                accept_presentation_document_targets: ["iframe", "window"],
                accept_multiple: true,
                auto_create: true,
                data: scope.message_hint.as_deref(),
            },
        )?;
        Ok(())
    }
}
