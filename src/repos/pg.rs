/*
 * Responsibility
 * - PlatformStore の Postgres 実装 (SQLx)
 * - PgPool を受け取り、行 → ドメイン型への変換までを担う
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::domain::{
    Context, CustomPermissions, Deployment, DisclosurePermissions, Grade, LineItem, Membership,
    PlatformDescriptor, ResourceLink, Role, Tool, ToolKeySet, User,
};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::store::PlatformStore;

#[derive(Clone, Debug)]
pub struct PgPlatformStore {
    pool: PgPool,
}

impl PgPlatformStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ToolRow {
    client_id: String,
    name: String,
    login_url: String,
    launch_url: String,
    deep_link_url: Option<String>,
    redirect_uris: Vec<String>,
    key_set: Option<Json<ToolKeySet>>,
    service_scopes: Vec<String>,
    disclosure: Json<DisclosurePermissions>,
    custom_permissions: Vec<String>,
    custom: Json<BTreeMap<String, String>>,
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Tool {
            client_id: row.client_id,
            name: row.name,
            login_url: row.login_url,
            launch_url: row.launch_url,
            deep_link_url: row.deep_link_url,
            redirect_uris: row.redirect_uris,
            key_set: row.key_set.map(|k| k.0),
            service_scopes: row.service_scopes,
            disclosure: row.disclosure.0,
            custom_permissions: CustomPermissions::new(row.custom_permissions),
            custom: row.custom.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct DeploymentRow {
    deployment_id: String,
    tool_client_id: String,
    custom: Json<BTreeMap<String, String>>,
}

#[derive(Debug, FromRow)]
struct ContextRow {
    id: String,
    deployment_id: String,
    label: Option<String>,
    title: Option<String>,
    types: Vec<String>,
    orgs: Vec<String>,
    history: Vec<String>,
    grade_levels: Vec<String>,
}

#[derive(Debug, FromRow)]
struct ResourceLinkRow {
    id: String,
    deployment_id: String,
    context_id: String,
    title: Option<String>,
    description: Option<String>,
    available_start: Option<DateTime<Utc>>,
    available_end: Option<DateTime<Utc>>,
    submission_start: Option<DateTime<Utc>>,
    submission_end: Option<DateTime<Utc>>,
    custom: Json<BTreeMap<String, String>>,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    username: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    middle_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    locale: Option<String>,
    timezone: Option<String>,
    sourced_id: Option<String>,
    orgs: Vec<String>,
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    context_id: String,
    user_id: String,
    roles: Vec<String>,
}

#[derive(Debug, FromRow)]
struct PlatformRow {
    guid: String,
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    contact_email: Option<String>,
    product_family_code: Option<String>,
    version: Option<String>,
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: String,
    resource_link_id: String,
    label: Option<String>,
    score_maximum: f64,
}

#[derive(Debug, FromRow)]
struct GradeRow {
    line_item_id: String,
    user_id: String,
    score_given: Option<f64>,
    attempts: i32,
}

#[async_trait]
impl PlatformStore for PgPlatformStore {
    async fn get_tool(&self, client_id: &str) -> RepoResult<Option<Tool>> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT
                client_id, name, login_url, launch_url, deep_link_url, redirect_uris,
                key_set, service_scopes, disclosure, custom_permissions, custom
            FROM tools
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tool::from))
    }

    async fn get_deployment(&self, deployment_id: &str) -> RepoResult<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT deployment_id, tool_client_id, custom
            FROM deployments
            WHERE deployment_id = $1
            "#,
        )
        .bind(deployment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Deployment {
            deployment_id: r.deployment_id,
            tool_client_id: r.tool_client_id,
            custom: r.custom.0,
        }))
    }

    async fn get_context(&self, context_id: &str) -> RepoResult<Option<Context>> {
        let row = sqlx::query_as::<_, ContextRow>(
            r#"
            SELECT id, deployment_id, label, title, types, orgs, history, grade_levels
            FROM contexts
            WHERE id = $1
            "#,
        )
        .bind(context_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Context {
            id: r.id,
            deployment_id: r.deployment_id,
            label: r.label,
            title: r.title,
            types: r.types,
            orgs: r.orgs,
            history: r.history,
            grade_levels: r.grade_levels,
        }))
    }

    async fn get_resource_link(&self, resource_link_id: &str) -> RepoResult<Option<ResourceLink>> {
        let row = sqlx::query_as::<_, ResourceLinkRow>(
            r#"
            SELECT
                id, deployment_id, context_id, title, description,
                available_start, available_end, submission_start, submission_end, custom
            FROM resource_links
            WHERE id = $1
            "#,
        )
        .bind(resource_link_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ResourceLink {
            id: r.id,
            deployment_id: r.deployment_id,
            context_id: r.context_id,
            title: r.title,
            description: r.description,
            available_start: r.available_start,
            available_end: r.available_end,
            submission_start: r.submission_start,
            submission_end: r.submission_end,
            custom: r.custom.0,
        }))
    }

    async fn get_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id, username, name, given_name, family_name, middle_name,
                email, picture, locale, timezone, sourced_id, orgs
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| User {
            id: r.id,
            username: r.username,
            name: r.name,
            given_name: r.given_name,
            family_name: r.family_name,
            middle_name: r.middle_name,
            email: r.email,
            picture: r.picture,
            locale: r.locale,
            timezone: r.timezone,
            sourced_id: r.sourced_id,
            orgs: r.orgs,
        }))
    }

    async fn get_membership(
        &self,
        context_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT context_id, user_id, roles
            FROM memberships
            WHERE context_id = $1 AND user_id = $2
            "#,
        )
        .bind(context_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let roles = row
            .roles
            .iter()
            .map(|name| {
                Role::from_name(name).ok_or_else(|| RepoError::Decode(format!("unknown role {name}")))
            })
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(Some(Membership {
            context_id: row.context_id,
            user_id: row.user_id,
            roles,
        }))
    }

    async fn get_mentees(&self, context_id: &str, mentor_id: &str) -> RepoResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT mentee_id
            FROM mentorships
            WHERE context_id = $1 AND mentor_id = $2
            ORDER BY mentee_id
            "#,
        )
        .bind(context_id)
        .bind(mentor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn get_platform(&self) -> RepoResult<Option<PlatformDescriptor>> {
        let row = sqlx::query_as::<_, PlatformRow>(
            r#"
            SELECT guid, name, description, url, contact_email, product_family_code, version
            FROM platform
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PlatformDescriptor {
            guid: r.guid,
            name: r.name,
            description: r.description,
            url: r.url,
            contact_email: r.contact_email,
            product_family_code: r.product_family_code,
            version: r.version,
        }))
    }

    async fn get_line_item(&self, resource_link_id: &str) -> RepoResult<Option<LineItem>> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, resource_link_id, label, score_maximum
            FROM line_items
            WHERE resource_link_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(resource_link_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LineItem {
            id: r.id,
            resource_link_id: r.resource_link_id,
            label: r.label,
            score_maximum: r.score_maximum,
        }))
    }

    async fn get_grade(&self, line_item_id: &str, user_id: &str) -> RepoResult<Option<Grade>> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT line_item_id, user_id, score_given, attempts
            FROM grades
            WHERE line_item_id = $1 AND user_id = $2
            "#,
        )
        .bind(line_item_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Grade {
            line_item_id: r.line_item_id,
            user_id: r.user_id,
            score_given: r.score_given,
            attempts: u32::try_from(r.attempts).unwrap_or(0),
        }))
    }
}
