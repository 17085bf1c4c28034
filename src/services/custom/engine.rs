//! Resolves `$Variable` values in a launch's merged custom parameters.
//!
//! Secondary lookups (platform descriptor, membership, mentees, grade) run at most
//! once per launch and only when a permitted variable refers to them.
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Grade, LineItem, Membership, PlatformDescriptor, Role, User};
use crate::repos::{PlatformStore, RepoError};
use crate::services::claims::MessageScope;
use crate::services::custom::variables::{Lookup, Subject, Variable};

#[derive(Debug, Error)]
pub enum SubstitutionError {
    #[error("custom variable lookup failed: {0}")]
    Store(#[from] RepoError),
}

/// Tool, then deployment, then resource link. Later sources win on key collision.
pub fn merge_custom(scope: &MessageScope) -> BTreeMap<String, String> {
    let mut merged = scope.tool.custom.clone();
    merged.extend(scope.deployment.custom.clone());
    if let Some(link) = &scope.resource_link {
        merged.extend(link.custom.clone());
    }
    merged
}

/// Merge the custom maps and substitute every `$`-prefixed value.
///
/// Unknown, inapplicable, and permission-denied variables all become `""`.
pub async fn substitute(
    store: &dyn PlatformStore,
    scope: &MessageScope,
) -> Result<BTreeMap<String, String>, SubstitutionError> {
    let merged = merge_custom(scope);

    let referenced: HashSet<Variable> = merged
        .values()
        .filter(|v| v.starts_with('$'))
        .filter_map(|v| Variable::parse(v))
        .filter(|v| permitted(*v, scope))
        .collect();

    let data = Lookups::load(store, scope, &referenced).await?;

    Ok(merged
        .into_iter()
        .map(|(key, value)| {
            if !value.starts_with('$') {
                return (key, value);
            }
            let resolved = Variable::parse(&value)
                .filter(|v| referenced.contains(v))
                .and_then(|v| data.resolve(v, scope))
                .unwrap_or_default();
            (key, resolved)
        })
        .collect())
}

fn permitted(variable: Variable, scope: &MessageScope) -> bool {
    if !scope.tool.custom_permissions.allows(variable.name()) {
        return false;
    }
    match variable.subject() {
        Subject::User => !scope.user.anonymous,
        Subject::ActualUser => !scope.user.anonymous && scope.user.actual_user.is_some(),
        Subject::Other => true,
    }
}

/// Only a mentor in this context has mentees to disclose.
async fn mentees_of(
    store: &dyn PlatformStore,
    context_id: &str,
    user_id: &str,
) -> Result<Vec<String>, RepoError> {
    let is_mentor = store
        .get_membership(context_id, user_id)
        .await?
        .is_some_and(|m| m.has_role(Role::Mentor));
    if is_mentor {
        store.get_mentees(context_id, user_id).await
    } else {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
struct Lookups {
    platform: Option<PlatformDescriptor>,
    membership: Option<Membership>,
    mentees: Vec<String>,
    actual_mentees: Vec<String>,
    line_item: Option<LineItem>,
    grade: Option<Grade>,
}

impl Lookups {
    async fn load(
        store: &dyn PlatformStore,
        scope: &MessageScope,
        referenced: &HashSet<Variable>,
    ) -> Result<Self, RepoError> {
        let needs = |lookup: Lookup| referenced.iter().any(|v| v.lookup() == lookup);
        let user_id = scope.user.user.id.as_str();
        let context_id = scope.context_id();

        let platform = async {
            if needs(Lookup::Platform) {
                store.get_platform().await
            } else {
                Ok(None)
            }
        };

        let membership = async {
            match context_id {
                Some(ctx) if needs(Lookup::Membership) => store.get_membership(ctx, user_id).await,
                _ => Ok(None),
            }
        };

        let mentees = async {
            match context_id {
                Some(ctx) if needs(Lookup::Mentees) => mentees_of(store, ctx, user_id).await,
                _ => Ok(Vec::new()),
            }
        };

        let actual_mentees = async {
            match (context_id, scope.user.actual_user.as_ref()) {
                (Some(ctx), Some(actual)) if needs(Lookup::ActualMentees) => {
                    mentees_of(store, ctx, &actual.id).await
                }
                _ => Ok(Vec::new()),
            }
        };

        let grade = async {
            let Some(link_id) = scope.resource_link_id() else {
                return Ok((None, None));
            };
            if !needs(Lookup::Grade) {
                return Ok((None, None));
            }
            let Some(line_item) = store.get_line_item(link_id).await? else {
                return Ok((None, None));
            };
            let grade = store.get_grade(&line_item.id, user_id).await?;
            Ok::<_, RepoError>((Some(line_item), grade))
        };

        let (platform, membership, mentees, actual_mentees, (line_item, grade)) =
            tokio::try_join!(platform, membership, mentees, actual_mentees, grade)?;

        debug!(
            variables = referenced.len(),
            platform = platform.is_some(),
            membership = membership.is_some(),
            line_item = line_item.is_some(),
            "custom variable lookups loaded"
        );

        Ok(Self {
            platform,
            membership,
            mentees,
            actual_mentees,
            line_item,
            grade,
        })
    }

    fn resolve(&self, variable: Variable, scope: &MessageScope) -> Option<String> {
        use Variable::*;

        let user = &scope.user.user;
        let actual = scope.user.actual_user.as_ref();
        let context = scope.context.as_ref();
        let link = scope.resource_link.as_ref();
        let platform = self.platform.as_ref();

        match variable {
            UserId => Some(user.id.clone()),
            UserImage => user.picture.clone(),
            UserUsername => user.username.clone(),
            UserOrg => joined(&user.orgs),
            UserScopeMentor | MembershipRoleScopeMentor => joined(&self.mentees),

            ActualUserId => actual.map(|u| u.id.clone()),
            ActualUserImage => actual.and_then(|u| u.picture.clone()),
            ActualUserUsername => actual.and_then(|u| u.username.clone()),
            ActualUserOrg => actual.and_then(|u| joined(&u.orgs)),
            ActualUserScopeMentor => joined(&self.actual_mentees),

            PersonSourcedId => user.sourced_id.clone(),
            PersonNameFull => full_name(user),
            PersonNameFamily => user.family_name.clone(),
            PersonNameGiven => user.given_name.clone(),
            PersonNameMiddle => user.middle_name.clone(),
            PersonEmailPrimary => user.email.clone(),
            PersonAddressTimezone => user.timezone.clone(),

            ContextId => context.map(|c| c.id.clone()),
            ContextOrg => context.and_then(|c| joined(&c.orgs)),
            ContextType => context.and_then(|c| joined(&c.types)),
            ContextLabel => context.and_then(|c| c.label.clone()),
            ContextTitle => context.and_then(|c| c.title.clone()),
            ContextIdHistory => context.and_then(|c| joined(&c.history)),
            ContextGradeLevels => context.and_then(|c| joined(&c.grade_levels)),

            ResourceLinkId => link.map(|l| l.id.clone()),
            ResourceLinkTitle => link.and_then(|l| l.title.clone()),
            ResourceLinkDescription => link.and_then(|l| l.description.clone()),
            ResourceLinkAvailableStart => link.and_then(|l| timestamp(l.available_start)),
            ResourceLinkAvailableEnd => link.and_then(|l| timestamp(l.available_end)),
            ResourceLinkSubmissionStart => link.and_then(|l| timestamp(l.submission_start)),
            ResourceLinkSubmissionEnd => link.and_then(|l| timestamp(l.submission_end)),

            PlatformGuid => platform.map(|p| p.guid.clone()),
            PlatformName => platform.and_then(|p| p.name.clone()),
            PlatformDescription => platform.and_then(|p| p.description.clone()),
            PlatformUrl => platform.and_then(|p| p.url.clone()),
            PlatformContactEmail => platform.and_then(|p| p.contact_email.clone()),

            MembershipRole => self.membership.as_ref().and_then(|m| {
                let names: Vec<String> = m.roles.iter().map(|r| r.name().to_string()).collect();
                joined(&names)
            }),

            LineItemId => self.line_item.as_ref().map(|li| li.id.clone()),
            LineItemLabel => self.line_item.as_ref().and_then(|li| li.label.clone()),
            LineItemResultMax => self
                .line_item
                .as_ref()
                .map(|li| li.score_maximum.to_string()),
            ResultScore => self
                .grade
                .as_ref()
                .and_then(|g| g.score_given)
                .map(|s| s.to_string()),
            ResultAttempts => Some(self.grade.as_ref().map_or(0, |g| g.attempts).to_string()),
        }
    }
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

fn full_name(user: &User) -> Option<String> {
    if let Some(name) = &user.name {
        return Some(name.clone());
    }
    let parts: Vec<&str> = [&user.given_name, &user.middle_name, &user.family_name]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(|t| t.to_rfc3339())
}
