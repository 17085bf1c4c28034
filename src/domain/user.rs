use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub middle_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub sourced_id: Option<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
            given_name: None,
            family_name: None,
            middle_name: None,
            email: None,
            picture: None,
            locale: None,
            timezone: None,
            sourced_id: None,
            orgs: Vec::new(),
        }
    }
}

/// A user's membership in one context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub context_id: String,
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl Membership {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// LIS context roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    ContentDeveloper,
    Instructor,
    Learner,
    Mentor,
    TeachingAssistant,
}

impl Role {
    pub fn uri(self) -> &'static str {
        match self {
            Role::Administrator => "http://purl.imsglobal.org/vocab/lis/v2/membership#Administrator",
            Role::ContentDeveloper => {
                "http://purl.imsglobal.org/vocab/lis/v2/membership#ContentDeveloper"
            }
            Role::Instructor => "http://purl.imsglobal.org/vocab/lis/v2/membership#Instructor",
            Role::Learner => "http://purl.imsglobal.org/vocab/lis/v2/membership#Learner",
            Role::Mentor => "http://purl.imsglobal.org/vocab/lis/v2/membership#Mentor",
            Role::TeachingAssistant => {
                "http://purl.imsglobal.org/vocab/lis/v2/membership/Instructor#TeachingAssistant"
            }
        }
    }

    /// Short name used by `$Membership.role`.
    pub fn name(self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::ContentDeveloper => "ContentDeveloper",
            Role::Instructor => "Instructor",
            Role::Learner => "Learner",
            Role::Mentor => "Mentor",
            Role::TeachingAssistant => "TeachingAssistant",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Administrator" => Some(Role::Administrator),
            "ContentDeveloper" => Some(Role::ContentDeveloper),
            "Instructor" => Some(Role::Instructor),
            "Learner" => Some(Role::Learner),
            "Mentor" => Some(Role::Mentor),
            "TeachingAssistant" => Some(Role::TeachingAssistant),
            _ => None,
        }
    }
}
