use std::collections::{BTreeMap, BTreeSet};

use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};

/// A registered OAuth2 client (an LTI tool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub client_id: String,
    pub name: String,
    /// OIDC third-party initiated login URL.
    pub login_url: String,
    pub launch_url: String,
    pub deep_link_url: Option<String>,
    /// Additional redirect URIs besides the launch and deep-link URLs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    pub key_set: Option<ToolKeySet>,
    /// Service scopes granted to the tool (AGS / NRPS scope URIs).
    #[serde(default)]
    pub service_scopes: Vec<String>,
    #[serde(default)]
    pub disclosure: DisclosurePermissions,
    #[serde(default)]
    pub custom_permissions: CustomPermissions,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

impl Tool {
    /// Redirect URIs a launch may post back to.
    pub fn accepts_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.launch_url == redirect_uri
            || self.deep_link_url.as_deref() == Some(redirect_uri)
            || self.redirect_uris.iter().any(|u| u == redirect_uri)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.service_scopes.iter().any(|s| s == scope)
    }
}

/// Where a tool publishes the keys it signs client assertions with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ToolKeySet {
    Inline(JwkSet),
    Uri(String),
}

/// Which OIDC profile fields the tool may receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosurePermissions {
    #[serde(default)]
    pub name: bool,
    #[serde(default)]
    pub given_name: bool,
    #[serde(default)]
    pub family_name: bool,
    #[serde(default)]
    pub middle_name: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub picture: bool,
    #[serde(default)]
    pub locale: bool,
}

impl DisclosurePermissions {
    pub fn all() -> Self {
        Self {
            name: true,
            given_name: true,
            family_name: true,
            middle_name: true,
            email: true,
            picture: true,
            locale: true,
        }
    }
}

/// Per-variable grants for `$Variable` substitution in custom parameters.
///
/// A variable that is not granted resolves to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomPermissions {
    granted: BTreeSet<String>,
}

impl CustomPermissions {
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// `variable` is the name without the leading `$`, e.g. `User.id`.
    pub fn allows(&self, variable: &str) -> bool {
        self.granted.contains(variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }
}
