/*
 * Responsibility
 * - プラットフォーム側エンティティ (Tool / Deployment / Context / ResourceLink / User)
 * - リクエスト中は不変。Data Access Port (repos) から取得して MessageScope に載せる
 */
pub mod context;
pub mod platform;
pub mod tool;
pub mod user;

pub use context::{Context, Deployment, ResourceLink};
pub use platform::{Grade, LineItem, PlatformDescriptor, ServiceToken};
pub use tool::{CustomPermissions, DisclosurePermissions, Tool, ToolKeySet};
pub use user::{Membership, Role, User};
