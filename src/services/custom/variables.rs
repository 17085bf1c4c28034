//! The `$Variable` table.
//!
//! Names are written without the leading `$`; that is also the form a tool's
//! [`CustomPermissions`](crate::domain::CustomPermissions) grants them in.

/// Secondary data a variable needs beyond the [`MessageScope`](crate::services::claims::MessageScope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    None,
    Platform,
    Membership,
    Mentees,
    ActualMentees,
    Grade,
}

/// Whose data a variable exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    User,
    ActualUser,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    UserId,
    UserImage,
    UserUsername,
    UserOrg,
    UserScopeMentor,

    ActualUserId,
    ActualUserImage,
    ActualUserUsername,
    ActualUserOrg,
    ActualUserScopeMentor,

    PersonSourcedId,
    PersonNameFull,
    PersonNameFamily,
    PersonNameGiven,
    PersonNameMiddle,
    PersonEmailPrimary,
    PersonAddressTimezone,

    ContextId,
    ContextOrg,
    ContextType,
    ContextLabel,
    ContextTitle,
    ContextIdHistory,
    ContextGradeLevels,

    ResourceLinkId,
    ResourceLinkTitle,
    ResourceLinkDescription,
    ResourceLinkAvailableStart,
    ResourceLinkAvailableEnd,
    ResourceLinkSubmissionStart,
    ResourceLinkSubmissionEnd,

    PlatformGuid,
    PlatformName,
    PlatformDescription,
    PlatformUrl,
    PlatformContactEmail,

    MembershipRole,
    MembershipRoleScopeMentor,

    LineItemId,
    LineItemLabel,
    LineItemResultMax,
    ResultScore,
    ResultAttempts,
}

use Variable::*;

const TABLE: &[(&str, Variable)] = &[
    ("User.id", UserId),
    ("User.image", UserImage),
    ("User.username", UserUsername),
    ("User.org", UserOrg),
    ("User.scope.mentor", UserScopeMentor),
    ("ActualUser.id", ActualUserId),
    ("ActualUser.image", ActualUserImage),
    ("ActualUser.username", ActualUserUsername),
    ("ActualUser.org", ActualUserOrg),
    ("ActualUser.scope.mentor", ActualUserScopeMentor),
    ("Person.sourcedId", PersonSourcedId),
    ("Person.name.full", PersonNameFull),
    ("Person.name.family", PersonNameFamily),
    ("Person.name.given", PersonNameGiven),
    ("Person.name.middle", PersonNameMiddle),
    ("Person.email.primary", PersonEmailPrimary),
    ("Person.address.timezone", PersonAddressTimezone),
    ("Context.id", ContextId),
    ("Context.org", ContextOrg),
    ("Context.type", ContextType),
    ("Context.label", ContextLabel),
    ("Context.title", ContextTitle),
    ("Context.id.history", ContextIdHistory),
    ("Context.gradeLevels.oneRoster", ContextGradeLevels),
    ("ResourceLink.id", ResourceLinkId),
    ("ResourceLink.title", ResourceLinkTitle),
    ("ResourceLink.description", ResourceLinkDescription),
    ("ResourceLink.available.startDateTime", ResourceLinkAvailableStart),
    ("ResourceLink.available.endDateTime", ResourceLinkAvailableEnd),
    ("ResourceLink.submission.startDateTime", ResourceLinkSubmissionStart),
    ("ResourceLink.submission.endDateTime", ResourceLinkSubmissionEnd),
    ("ToolPlatformInstance.guid", PlatformGuid),
    ("ToolPlatformInstance.name", PlatformName),
    ("ToolPlatformInstance.description", PlatformDescription),
    ("ToolPlatformInstance.url", PlatformUrl),
    ("ToolPlatformInstance.contactEmail", PlatformContactEmail),
    ("Membership.role", MembershipRole),
    ("Membership.role.scope.mentor", MembershipRoleScopeMentor),
    ("LineItem.sourcedId", LineItemId),
    ("LineItem.label", LineItemLabel),
    ("LineItem.resultValue.max", LineItemResultMax),
    ("Result.resultScore", ResultScore),
    ("Result.attempts", ResultAttempts),
];

impl Variable {
    /// Parse a variable name, with or without the leading `$`.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.strip_prefix('$').unwrap_or(raw);
        TABLE.iter().find(|(n, _)| *n == name).map(|&(_, v)| v)
    }

    pub fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(n, _)| *n)
            .unwrap_or_default()
    }

    pub fn all() -> impl Iterator<Item = Variable> {
        TABLE.iter().map(|&(_, v)| v)
    }

    pub fn lookup(self) -> Lookup {
        match self {
            PlatformGuid | PlatformName | PlatformDescription | PlatformUrl
            | PlatformContactEmail => Lookup::Platform,
            MembershipRole => Lookup::Membership,
            UserScopeMentor | MembershipRoleScopeMentor => Lookup::Mentees,
            ActualUserScopeMentor => Lookup::ActualMentees,
            LineItemId | LineItemLabel | LineItemResultMax | ResultScore | ResultAttempts => {
                Lookup::Grade
            }
            _ => Lookup::None,
        }
    }

    /// User-bound variables are blanked for anonymous launches.
    pub fn subject(self) -> Subject {
        match self {
            UserId | UserImage | UserUsername | UserOrg | UserScopeMentor
            | MembershipRoleScopeMentor | PersonSourcedId | PersonNameFull | PersonNameFamily
            | PersonNameGiven | PersonNameMiddle | PersonEmailPrimary | PersonAddressTimezone => {
                Subject::User
            }
            ActualUserId | ActualUserImage | ActualUserUsername | ActualUserOrg
            | ActualUserScopeMentor => Subject::ActualUser,
            _ => Subject::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_the_table() {
        for v in Variable::all() {
            assert_eq!(Variable::parse(v.name()), Some(v));
        }
        assert_eq!(Variable::parse("$User.id"), Some(UserId));
        assert_eq!(Variable::parse("$User.nope"), None);
    }

    #[test]
    fn mentor_scopes_are_bound_to_their_user() {
        assert_eq!(UserScopeMentor.subject(), Subject::User);
        assert_eq!(MembershipRoleScopeMentor.subject(), Subject::User);
        assert_eq!(ActualUserScopeMentor.subject(), Subject::ActualUser);
    }

    #[test]
    fn table_has_no_duplicate_names() {
        let mut names: Vec<_> = TABLE.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TABLE.len());
    }
}
