use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Describes this platform instance (`tool_platform` claim, `$ToolPlatformInstance.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub guid: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub contact_email: Option<String>,
    pub product_family_code: Option<String>,
    pub version: Option<String>,
}

/// Gradebook column bound to a resource link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub resource_link_id: String,
    pub label: Option<String>,
    pub score_maximum: f64,
}

/// A user's latest result on a line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub line_item_id: String,
    pub user_id: String,
    pub score_given: Option<f64>,
    pub attempts: u32,
}

/// Replay-guard record for a client assertion `jti`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    pub tool_client_id: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}
