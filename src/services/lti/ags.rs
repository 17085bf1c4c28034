use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::repos::PlatformStore;
use crate::services::claims::{
    ClaimKind, ClaimShape, LtiMessage, LtiModule, MessageScope, PopulateError, Populator,
    RegistryBuilder, RegistryError,
};
use crate::services::lti::{DEEP_LINKING_REQUEST, RESOURCE_LINK_REQUEST, ServiceUrls, scopes};

pub const ENDPOINT: &str = "https://purl.imsglobal.org/spec/lti-ags/claim/endpoint";

/// Assignment and Grade Services endpoint claim.
pub struct AgsModule {
    store: Arc<dyn PlatformStore>,
    urls: ServiceUrls,
}

impl AgsModule {
    pub fn new(store: Arc<dyn PlatformStore>, urls: ServiceUrls) -> Self {
        Self { store, urls }
    }
}

impl LtiModule for AgsModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        for message_type in [RESOURCE_LINK_REQUEST, DEEP_LINKING_REQUEST] {
            registry.register(
                message_type,
                ClaimShape::new("AgsEndpoint").field(ENDPOINT, ClaimKind::Object),
                Arc::new(AgsPopulator {
                    store: self.store.clone(),
                    urls: self.urls.clone(),
                }),
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EndpointClaim<'a> {
    scope: Vec<&'a str>,
    lineitems: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lineitem: Option<String>,
}

struct AgsPopulator {
    store: Arc<dyn PlatformStore>,
    urls: ServiceUrls,
}

#[async_trait]
impl Populator for AgsPopulator {
    fn name(&self) -> &'static str {
        "ags_endpoint"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let Some(context_id) = scope.context_id() else {
            return Ok(());
        };

        let granted: Vec<&str> = scopes::AGS
            .into_iter()
            .filter(|s| scope.tool.has_scope(s))
            .collect();
        if granted.is_empty() {
            return Ok(());
        }

        let lineitem = match scope.resource_link_id() {
            Some(link_id) => self
                .store
                .get_line_item(link_id)
                .await?
                .map(|li| self.urls.line_item(context_id, &li.id)),
            None => None,
        };

        message.set_json(
            ENDPOINT,
            &EndpointClaim {
                scope: granted,
                lineitems: self.urls.line_items(context_id),
                lineitem,
            },
        )?;
        Ok(())
    }
}
