/*
 * Responsibility
 * - OIDC pre-flight をまたいでブラウザ経由で往復する launch 状態の encode/decode
 * - login_hint / lti_message_hint の wire format をここに閉じ込める
 *
 * decode 結果は信頼境界ではない:
 * - deployment の所有者や resource link の所属は呼び出し側で必ず再検証する
 */
use std::{error::Error, fmt};

const DELIMITER: char = '|';
const LOGIN_HINT_FIELDS: usize = 3;
const MESSAGE_HINT_FIELDS: usize = 5;

pub type Result<T> = std::result::Result<T, HintError>;

#[derive(Debug, PartialEq, Eq)]
pub enum HintError {
    /// Wrong number of `|`-separated fields.
    Arity { expected: usize, actual: usize },
    MissingField(&'static str),
    InvalidFlag(String),
    /// A non-trailing field contains the delimiter and would not round-trip.
    Delimiter(&'static str),
}

impl fmt::Display for HintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HintError::Arity { expected, actual } => {
                write!(f, "expected {} hint fields, got {}", expected, actual)
            }
            HintError::MissingField(name) => write!(f, "hint field '{}' is empty", name),
            HintError::InvalidFlag(value) => write!(f, "invalid anonymous flag '{}'", value),
            HintError::Delimiter(name) => {
                write!(f, "hint field '{}' must not contain '{}'", name, DELIMITER)
            }
        }
    }
}

impl Error for HintError {}

/// Identity carried by `login_hint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginHint {
    pub user_id: String,
    /// Present when an administrator is impersonating `user_id`.
    pub actual_user_id: Option<String>,
    pub anonymous: bool,
}

impl LoginHint {
    pub fn is_impersonation(&self) -> bool {
        self.actual_user_id.is_some()
    }

    /// `{userId}|{1 if anonymous else ''}|{actualUserId}`
    pub fn encode(&self) -> Result<String> {
        require("user_id", &self.user_id)?;
        reject_delimiter("user_id", &self.user_id)?;

        Ok(format!(
            "{}{d}{}{d}{}",
            self.user_id,
            if self.anonymous { "1" } else { "" },
            self.actual_user_id.as_deref().unwrap_or(""),
            d = DELIMITER
        ))
    }

    pub fn decode(hint: &str) -> Result<Self> {
        let fields = split_fields(hint, LOGIN_HINT_FIELDS)?;

        let user_id = fields[0];
        require("user_id", user_id)?;

        let anonymous = match fields[1] {
            "" => false,
            "1" => true,
            other => return Err(HintError::InvalidFlag(other.to_string())),
        };

        Ok(Self {
            user_id: user_id.to_string(),
            actual_user_id: optional(fields[2]),
            anonymous,
        })
    }
}

/// Launch target carried by `lti_message_hint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHint {
    pub message_type: String,
    pub deployment_id: String,
    pub context_id: Option<String>,
    pub resource_link_id: Option<String>,
    /// Opaque value for feature modules (e.g. deep-linking `data`).
    pub extra: Option<String>,
}

impl MessageHint {
    /// `{messageType}|{deploymentId}|{contextId}|{resourceLinkId}|{extraHint}`
    pub fn encode(&self) -> Result<String> {
        require("message_type", &self.message_type)?;
        require("deployment_id", &self.deployment_id)?;
        reject_delimiter("message_type", &self.message_type)?;
        reject_delimiter("deployment_id", &self.deployment_id)?;
        if let Some(id) = &self.context_id {
            reject_delimiter("context_id", id)?;
        }
        if let Some(id) = &self.resource_link_id {
            reject_delimiter("resource_link_id", id)?;
        }

        Ok(format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            self.message_type,
            self.deployment_id,
            self.context_id.as_deref().unwrap_or(""),
            self.resource_link_id.as_deref().unwrap_or(""),
            self.extra.as_deref().unwrap_or(""),
            d = DELIMITER
        ))
    }

    pub fn decode(hint: &str) -> Result<Self> {
        let fields = split_fields(hint, MESSAGE_HINT_FIELDS)?;

        require("message_type", fields[0])?;
        require("deployment_id", fields[1])?;

        Ok(Self {
            message_type: fields[0].to_string(),
            deployment_id: fields[1].to_string(),
            context_id: optional(fields[2]),
            resource_link_id: optional(fields[3]),
            extra: optional(fields[4]),
        })
    }
}

pub fn encode_login_hint(
    user_id: &str,
    actual_user_id: Option<&str>,
    anonymous: bool,
) -> Result<String> {
    LoginHint {
        user_id: user_id.to_string(),
        actual_user_id: actual_user_id.map(str::to_string),
        anonymous,
    }
    .encode()
}

pub fn encode_message_hint(
    message_type: &str,
    deployment_id: &str,
    context_id: Option<&str>,
    resource_link_id: Option<&str>,
    extra: Option<&str>,
) -> Result<String> {
    MessageHint {
        message_type: message_type.to_string(),
        deployment_id: deployment_id.to_string(),
        context_id: context_id.map(str::to_string),
        resource_link_id: resource_link_id.map(str::to_string),
        extra: extra.map(str::to_string),
    }
    .encode()
}

// The last field keeps any further delimiters, so the split never yields more than `expected`.
fn split_fields(hint: &str, expected: usize) -> Result<Vec<&str>> {
    let fields: Vec<&str> = hint.splitn(expected, DELIMITER).collect();
    if fields.len() != expected {
        return Err(HintError::Arity {
            expected,
            actual: fields.len(),
        });
    }
    Ok(fields)
}

fn require(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(HintError::MissingField(name));
    }
    Ok(())
}

fn reject_delimiter(name: &'static str, value: &str) -> Result<()> {
    if value.contains(DELIMITER) {
        return Err(HintError::Delimiter(name));
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
