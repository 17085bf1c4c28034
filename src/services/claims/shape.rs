use std::fmt;

use serde_json::Value;

/// JSON type a claim is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ClaimKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ClaimKind::String => value.is_string(),
            ClaimKind::Integer => value.is_i64() || value.is_u64(),
            ClaimKind::Number => value.is_number(),
            ClaimKind::Boolean => value.is_boolean(),
            ClaimKind::Array => value.is_array(),
            ClaimKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimKind::String => "string",
            ClaimKind::Integer => "integer",
            ClaimKind::Number => "number",
            ClaimKind::Boolean => "boolean",
            ClaimKind::Array => "array",
            ClaimKind::Object => "object",
        };
        f.write_str(s)
    }
}

/// A named, typed claim. `name` is the JWT claim key (often a claim URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimField {
    pub name: String,
    pub kind: ClaimKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMember {
    Field(ClaimField),
    /// Behaviour rather than data. Shapes carrying one are refused at registration.
    Operation(String),
}

/// A capability a feature module needs on the claims container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimShape {
    name: String,
    members: Vec<ShapeMember>,
}

impl ClaimShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn field(mut self, claim: impl Into<String>, kind: ClaimKind) -> Self {
        self.members.push(ShapeMember::Field(ClaimField {
            name: claim.into(),
            kind,
        }));
        self
    }

    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.members.push(ShapeMember::Operation(name.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[ShapeMember] {
        &self.members
    }

    pub fn fields(&self) -> impl Iterator<Item = &ClaimField> {
        self.members.iter().filter_map(|m| match m {
            ShapeMember::Field(f) => Some(f),
            ShapeMember::Operation(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_accept_matching_json() {
        assert!(ClaimKind::Integer.accepts(&json!(12)));
        assert!(!ClaimKind::Integer.accepts(&json!(1.5)));
        assert!(ClaimKind::Number.accepts(&json!(1.5)));
        assert!(ClaimKind::Object.accepts(&json!({"id": "x"})));
        assert!(!ClaimKind::String.accepts(&json!(null)));
    }
}
