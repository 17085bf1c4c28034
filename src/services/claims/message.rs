use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;
use thiserror::Error;

use crate::services::claims::names;
use crate::services::claims::shape::{ClaimField, ClaimKind, ClaimShape};

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("claim '{claim}' is not declared for {message_type}")]
    Undeclared { message_type: String, claim: String },
    #[error("claim '{claim}' expects {expected}")]
    WrongKind { claim: String, expected: ClaimKind },
    #[error("claim '{claim}' could not be serialized: {source}")]
    Serialize {
        claim: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fields every LTI message carries, independent of registered shapes.
pub fn base_fields() -> Vec<ClaimField> {
    const TEXT: ClaimKind = ClaimKind::String;
    const INT: ClaimKind = ClaimKind::Integer;

    [
        (names::ISS, TEXT),
        (names::AUD, TEXT),
        (names::AZP, TEXT),
        (names::EXP, INT),
        (names::IAT, INT),
        (names::NONCE, TEXT),
        (names::SUB, TEXT),
        (names::NAME, TEXT),
        (names::GIVEN_NAME, TEXT),
        (names::FAMILY_NAME, TEXT),
        (names::MIDDLE_NAME, TEXT),
        (names::EMAIL, TEXT),
        (names::PICTURE, TEXT),
        (names::LOCALE, TEXT),
        (names::MESSAGE_TYPE, TEXT),
        (names::VERSION, TEXT),
        (names::DEPLOYMENT_ID, TEXT),
    ]
    .into_iter()
    .map(|(name, kind)| ClaimField {
        name: name.to_string(),
        kind,
    })
    .collect()
}

/// The synthesized container type for one message type: the ordered union of
/// the base fields and every registered shape.
#[derive(Debug)]
pub struct MessageLayout {
    message_type: String,
    fields: Vec<ClaimField>,
    index: HashMap<String, usize>,
}

impl MessageLayout {
    /// Union in declaration order. Duplicate names keep their first declaration;
    /// conflicting kinds are refused earlier, when the registry is sealed.
    pub(crate) fn synthesize<'a>(
        message_type: &str,
        shapes: impl IntoIterator<Item = &'a ClaimShape>,
    ) -> Self {
        let mut fields = base_fields();
        let mut index: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        for field in shapes.into_iter().flat_map(ClaimShape::fields) {
            if index.contains_key(&field.name) {
                continue;
            }
            index.insert(field.name.clone(), fields.len());
            fields.push(field.clone());
        }

        Self {
            message_type: message_type.to_string(),
            fields,
            index,
        }
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn fields(&self) -> &[ClaimField] {
        &self.fields
    }

    pub fn kind_of(&self, claim: &str) -> Option<ClaimKind> {
        self.index.get(claim).map(|&i| self.fields[i].kind)
    }
}

/// One request's claims container. Created from a layout, filled by populators,
/// serialized once and dropped.
#[derive(Debug)]
pub struct LtiMessage {
    layout: Arc<MessageLayout>,
    values: HashMap<String, Value>,
}

impl LtiMessage {
    pub fn new(layout: Arc<MessageLayout>) -> Self {
        let mut values = HashMap::with_capacity(layout.fields.len());
        values.insert(
            names::MESSAGE_TYPE.to_string(),
            Value::String(layout.message_type.clone()),
        );
        values.insert(
            names::VERSION.to_string(),
            Value::String(names::LTI_VERSION.to_string()),
        );
        Self { layout, values }
    }

    pub fn message_type(&self) -> &str {
        self.layout.message_type()
    }

    pub fn layout(&self) -> &Arc<MessageLayout> {
        &self.layout
    }

    pub fn set(&mut self, claim: &str, value: impl Into<Value>) -> Result<(), ClaimError> {
        let value = value.into();
        let kind = self
            .layout
            .kind_of(claim)
            .ok_or_else(|| ClaimError::Undeclared {
                message_type: self.layout.message_type.clone(),
                claim: claim.to_string(),
            })?;

        if !kind.accepts(&value) {
            return Err(ClaimError::WrongKind {
                claim: claim.to_string(),
                expected: kind,
            });
        }

        self.values.insert(claim.to_string(), value);
        Ok(())
    }

    /// Serialize a typed claim body (e.g. a struct) into the container.
    pub fn set_json<T: Serialize>(&mut self, claim: &str, value: &T) -> Result<(), ClaimError> {
        let value = serde_json::to_value(value).map_err(|source| ClaimError::Serialize {
            claim: claim.to_string(),
            source,
        })?;
        self.set(claim, value)
    }

    pub fn set_opt(&mut self, claim: &str, value: Option<&str>) -> Result<(), ClaimError> {
        match value {
            Some(v) => self.set(claim, v),
            None => Ok(()),
        }
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.values.get(claim)
    }

    pub fn get_str(&self, claim: &str) -> Option<&str> {
        self.values.get(claim).and_then(Value::as_str)
    }

    pub fn remove(&mut self, claim: &str) -> Option<Value> {
        self.values.remove(claim)
    }
}

impl Serialize for LtiMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let set: Vec<(&str, &Value)> = self
            .layout
            .fields
            .iter()
            .filter_map(|f| self.values.get(&f.name).map(|v| (f.name.as_str(), v)))
            .collect();

        let mut map = serializer.serialize_map(Some(set.len()))?;
        for (name, value) in set {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
