//! Data Access Port consumed by the launch and token flows.
//!
//! Every lookup is async I/O. Implementations own caching; callers never cache.
use async_trait::async_trait;

use crate::domain::{
    Context, Deployment, Grade, LineItem, Membership, PlatformDescriptor, ResourceLink, Tool, User,
};
use crate::repos::error::RepoResult;

#[async_trait]
pub trait PlatformStore: Send + Sync + 'static {
    async fn get_tool(&self, client_id: &str) -> RepoResult<Option<Tool>>;

    async fn get_deployment(&self, deployment_id: &str) -> RepoResult<Option<Deployment>>;

    async fn get_context(&self, context_id: &str) -> RepoResult<Option<Context>>;

    async fn get_resource_link(&self, resource_link_id: &str) -> RepoResult<Option<ResourceLink>>;

    async fn get_user(&self, user_id: &str) -> RepoResult<Option<User>>;

    async fn get_membership(
        &self,
        context_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<Membership>>;

    /// Users the mentor is responsible for within the context.
    async fn get_mentees(&self, context_id: &str, mentor_id: &str) -> RepoResult<Vec<String>>;

    async fn get_platform(&self) -> RepoResult<Option<PlatformDescriptor>>;

    async fn get_line_item(&self, resource_link_id: &str) -> RepoResult<Option<LineItem>>;

    async fn get_grade(&self, line_item_id: &str, user_id: &str) -> RepoResult<Option<Grade>>;
}
