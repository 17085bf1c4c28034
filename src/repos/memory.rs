//! In-memory `PlatformStore` for development seeds and tests.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::{
    Context, Deployment, Grade, LineItem, Membership, PlatformDescriptor, ResourceLink, Tool, User,
};
use crate::repos::error::RepoResult;
use crate::repos::store::PlatformStore;

#[derive(Default)]
struct Tables {
    tools: HashMap<String, Tool>,
    deployments: HashMap<String, Deployment>,
    contexts: HashMap<String, Context>,
    resource_links: HashMap<String, ResourceLink>,
    users: HashMap<String, User>,
    // (context_id, user_id)
    memberships: HashMap<(String, String), Membership>,
    // (context_id, mentor_id) -> mentee ids
    mentees: HashMap<(String, String), Vec<String>>,
    platform: Option<PlatformDescriptor>,
    // resource_link_id -> line item
    line_items: HashMap<String, LineItem>,
    // (line_item_id, user_id)
    grades: HashMap<(String, String), Grade>,
}

/// Cheap to clone; all clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        // A poisoned lock only means another writer panicked mid-insert; the maps stay usable.
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn put_tool(&self, tool: Tool) -> &Self {
        self.write().tools.insert(tool.client_id.clone(), tool);
        self
    }

    pub fn put_deployment(&self, deployment: Deployment) -> &Self {
        self.write()
            .deployments
            .insert(deployment.deployment_id.clone(), deployment);
        self
    }

    pub fn put_context(&self, context: Context) -> &Self {
        self.write().contexts.insert(context.id.clone(), context);
        self
    }

    pub fn put_resource_link(&self, link: ResourceLink) -> &Self {
        self.write().resource_links.insert(link.id.clone(), link);
        self
    }

    pub fn put_user(&self, user: User) -> &Self {
        self.write().users.insert(user.id.clone(), user);
        self
    }

    pub fn put_membership(&self, membership: Membership) -> &Self {
        let key = (membership.context_id.clone(), membership.user_id.clone());
        self.write().memberships.insert(key, membership);
        self
    }

    pub fn put_mentees(&self, context_id: &str, mentor_id: &str, mentees: Vec<String>) -> &Self {
        self.write()
            .mentees
            .insert((context_id.to_string(), mentor_id.to_string()), mentees);
        self
    }

    pub fn put_platform(&self, platform: PlatformDescriptor) -> &Self {
        self.write().platform = Some(platform);
        self
    }

    pub fn put_line_item(&self, line_item: LineItem) -> &Self {
        self.write()
            .line_items
            .insert(line_item.resource_link_id.clone(), line_item);
        self
    }

    pub fn put_grade(&self, grade: Grade) -> &Self {
        let key = (grade.line_item_id.clone(), grade.user_id.clone());
        self.write().grades.insert(key, grade);
        self
    }
}

#[async_trait]
impl PlatformStore for MemoryStore {
    async fn get_tool(&self, client_id: &str) -> RepoResult<Option<Tool>> {
        Ok(self.read().tools.get(client_id).cloned())
    }

    async fn get_deployment(&self, deployment_id: &str) -> RepoResult<Option<Deployment>> {
        Ok(self.read().deployments.get(deployment_id).cloned())
    }

    async fn get_context(&self, context_id: &str) -> RepoResult<Option<Context>> {
        Ok(self.read().contexts.get(context_id).cloned())
    }

    async fn get_resource_link(&self, resource_link_id: &str) -> RepoResult<Option<ResourceLink>> {
        Ok(self.read().resource_links.get(resource_link_id).cloned())
    }

    async fn get_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        Ok(self.read().users.get(user_id).cloned())
    }

    async fn get_membership(
        &self,
        context_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<Membership>> {
        let key = (context_id.to_string(), user_id.to_string());
        Ok(self.read().memberships.get(&key).cloned())
    }

    async fn get_mentees(&self, context_id: &str, mentor_id: &str) -> RepoResult<Vec<String>> {
        let key = (context_id.to_string(), mentor_id.to_string());
        Ok(self.read().mentees.get(&key).cloned().unwrap_or_default())
    }

    async fn get_platform(&self) -> RepoResult<Option<PlatformDescriptor>> {
        Ok(self.read().platform.clone())
    }

    async fn get_line_item(&self, resource_link_id: &str) -> RepoResult<Option<LineItem>> {
        Ok(self.read().line_items.get(resource_link_id).cloned())
    }

    async fn get_grade(&self, line_item_id: &str, user_id: &str) -> RepoResult<Option<Grade>> {
        let key = (line_item_id.to_string(), user_id.to_string());
        Ok(self.read().grades.get(&key).cloned())
    }
}
