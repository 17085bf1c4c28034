/*
 * Responsibility
 * - 組み込みの LTI 機能モジュール (common / resource link / deep linking / AGS / NRPS)
 * - 外部モジュールと同じ RegistryBuilder の公開 API だけで登録する
 * - サービス URL の組み立て (ServiceUrls)
 */
pub mod ags;
pub mod common;
pub mod deep_linking;
pub mod nrps;
pub mod resource_link;

use std::sync::Arc;

use crate::repos::PlatformStore;
use crate::services::claims::{Registry, RegistryBuilder, RegistryError};

pub use ags::AgsModule;
pub use common::CommonLaunchModule;
pub use deep_linking::DeepLinkingModule;
pub use nrps::NrpsModule;
pub use resource_link::ResourceLinkModule;

pub const RESOURCE_LINK_REQUEST: &str = "LtiResourceLinkRequest";
pub const DEEP_LINKING_REQUEST: &str = "LtiDeepLinkingRequest";

/// Service scope URIs a tool can be granted.
pub mod scopes {
    pub const AGS_LINEITEM: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem";
    pub const AGS_LINEITEM_READONLY: &str =
        "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem.readonly";
    pub const AGS_RESULT_READONLY: &str =
        "https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly";
    pub const AGS_SCORE: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/score";
    pub const NRPS_CONTEXT_MEMBERSHIP_READONLY: &str =
        "https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly";

    pub const AGS: [&str; 4] = [
        AGS_LINEITEM,
        AGS_LINEITEM_READONLY,
        AGS_RESULT_READONLY,
        AGS_SCORE,
    ];
}

/// Platform service URLs placed in claims. Built from `PUBLIC_BASE_URL`.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    base: String,
}

impl ServiceUrls {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            base: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/api/v1/lti/token", self.base)
    }

    pub fn line_items(&self, context_id: &str) -> String {
        format!(
            "{}/api/lti/contexts/{}/lineitems",
            self.base,
            urlencoding::encode(context_id)
        )
    }

    pub fn line_item(&self, context_id: &str, line_item_id: &str) -> String {
        format!(
            "{}/{}",
            self.line_items(context_id),
            urlencoding::encode(line_item_id)
        )
    }

    pub fn memberships(&self, context_id: &str) -> String {
        format!(
            "{}/api/lti/contexts/{}/memberships",
            self.base,
            urlencoding::encode(context_id)
        )
    }

    pub fn deep_link_return(&self, deployment_id: &str) -> String {
        format!(
            "{}/api/lti/deployments/{}/deep_linking/response",
            self.base,
            urlencoding::encode(deployment_id)
        )
    }
}

/// Registry with every built-in module installed.
pub fn builtin_registry(
    store: Arc<dyn PlatformStore>,
    urls: ServiceUrls,
) -> Result<Registry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    builder
        .install(&CommonLaunchModule::new(store.clone()))?
        .install(&ResourceLinkModule::new(store.clone()))?
        .install(&DeepLinkingModule::new(urls.clone()))?
        .install(&AgsModule::new(store, urls.clone()))?
        .install(&NrpsModule::new(urls))?;
    builder.seal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::MemoryStore;

    #[test]
    fn builtin_modules_register_both_message_types() {
        let registry =
            builtin_registry(Arc::new(MemoryStore::new()), ServiceUrls::new("https://lms.example/"))
                .unwrap();
        assert!(registry.is_registered(RESOURCE_LINK_REQUEST));
        assert!(registry.is_registered(DEEP_LINKING_REQUEST));
        let mut types: Vec<_> = registry.message_types().collect();
        types.sort_unstable();
        assert_eq!(types, [DEEP_LINKING_REQUEST, RESOURCE_LINK_REQUEST]);
    }

    #[test]
    fn service_urls_escape_ids() {
        let urls = ServiceUrls::new("https://lms.example/");
        assert_eq!(
            urls.line_item("c 1", "li/2"),
            "https://lms.example/api/lti/contexts/c%201/lineitems/li%2F2"
        );
        assert_eq!(urls.token_endpoint(), "https://lms.example/api/v1/lti/token");
    }
}
