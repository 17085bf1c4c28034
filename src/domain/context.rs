use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One installation of a tool within the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub deployment_id: String,
    pub tool_client_id: String,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

/// A course or org unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub deployment_id: String,
    pub label: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub grade_levels: Vec<String>,
}

/// A placement of tool content inside a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLink {
    pub id: String,
    pub deployment_id: String,
    pub context_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub available_start: Option<DateTime<Utc>>,
    pub available_end: Option<DateTime<Utc>>,
    pub submission_start: Option<DateTime<Utc>>,
    pub submission_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}
