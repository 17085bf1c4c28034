use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::services::claims::{
    ClaimKind, ClaimShape, LtiMessage, LtiModule, MessageScope, PopulateError, Populator,
    RegistryBuilder, RegistryError,
};
use crate::services::lti::{DEEP_LINKING_REQUEST, RESOURCE_LINK_REQUEST, ServiceUrls, scopes};

pub const NAMES_ROLE_SERVICE: &str =
    "https://purl.imsglobal.org/spec/lti-nrps/claim/namesroleservice";

/// Names and Role Provisioning Services claim.
pub struct NrpsModule {
    urls: ServiceUrls,
}

impl NrpsModule {
    pub fn new(urls: ServiceUrls) -> Self {
        Self { urls }
    }
}

impl LtiModule for NrpsModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
        for message_type in [RESOURCE_LINK_REQUEST, DEEP_LINKING_REQUEST] {
            registry.register(
                message_type,
                ClaimShape::new("NamesRoleService").field(NAMES_ROLE_SERVICE, ClaimKind::Object),
                Arc::new(NrpsPopulator {
                    urls: self.urls.clone(),
                }),
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct NamesRoleServiceClaim {
    context_memberships_url: String,
    service_versions: [&'static str; 1],
}

struct NrpsPopulator {
    urls: ServiceUrls,
}

#[async_trait]
impl Populator for NrpsPopulator {
    fn name(&self) -> &'static str {
        "namesroleservice"
    }

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let Some(context_id) = scope.context_id() else {
            return Ok(());
        };
        if !scope.tool.has_scope(scopes::NRPS_CONTEXT_MEMBERSHIP_READONLY) {
            return Ok(());
        }

        message.set_json(
            NAMES_ROLE_SERVICE,
            &NamesRoleServiceClaim {
                context_memberships_url: self.urls.memberships(context_id),
                service_versions: ["2.0"],
            },
        )?;
        Ok(())
    }
}
