use crate::domain::{Context, Deployment, ResourceLink, Tool, User};

/// The launching principal.
#[derive(Debug, Clone)]
pub struct UserScope {
    pub user: User,
    /// The administrator behind an impersonated launch.
    pub actual_user: Option<User>,
    /// Suppresses every personally identifying claim regardless of disclosure permissions.
    pub anonymous: bool,
}

/// Everything a populator may read for one request. Built once after the hints
/// are decoded and the entities resolved; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MessageScope {
    pub message_type: String,
    pub user: UserScope,
    pub tool: Tool,
    pub deployment: Deployment,
    pub context: Option<Context>,
    pub resource_link: Option<ResourceLink>,
    pub message_hint: Option<String>,
}

impl MessageScope {
    pub fn context_id(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.id.as_str())
    }

    pub fn resource_link_id(&self) -> Option<&str> {
        self.resource_link.as_ref().map(|l| l.id.as_str())
    }
}
