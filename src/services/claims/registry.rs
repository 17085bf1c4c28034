//! Message-type registry.
//!
//! Feature modules register `(message type, shape, populator)` triples on a
//! [`RegistryBuilder`] during startup. [`RegistryBuilder::seal`] validates every
//! shape and yields an immutable [`Registry`] that request handlers share by `Arc`.
//! The container layout for a message type is synthesized on first use, once.
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::repos::RepoError;
use crate::services::claims::message::{ClaimError, LtiMessage, MessageLayout, base_fields};
use crate::services::claims::scope::MessageScope;
use crate::services::claims::shape::{ClaimKind, ClaimShape, ShapeMember};
use crate::services::custom::SubstitutionError;

/// Configuration errors. Raised while building the registry, except
/// `NotImplemented`, which means a hint named a type no module declared.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("message type must not be empty")]
    EmptyMessageType,
    #[error("shape '{shape}' declares non-field member '{member}'")]
    NonFieldMember { shape: String, member: String },
    #[error("shape '{shape}' declares a claim with an empty name")]
    EmptyClaimName { shape: String },
    #[error("{message_type}: claim '{claim}' declared as both {first} and {second}")]
    ConflictingClaim {
        message_type: String,
        claim: String,
        first: ClaimKind,
        second: ClaimKind,
    },
    #[error("no module registered message type '{0}'")]
    NotImplemented(String),
}

#[derive(Debug, Error)]
pub enum PopulateError {
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),
}

/// Fills claims on the container for one request.
///
/// Populators run in registration order, may read claims set by earlier ones,
/// and must not have side effects outside the container.
#[async_trait]
pub trait Populator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError>;
}

/// A feature module that contributes claims to one or more message types.
pub trait LtiModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError>;
}

#[derive(Default)]
struct PendingEntry {
    shapes: Vec<ClaimShape>,
    populators: Vec<Arc<dyn Populator>>,
}

#[derive(Default)]
pub struct RegistryBuilder {
    // Vec keeps registration order stable for logging.
    order: Vec<String>,
    entries: HashMap<String, PendingEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        message_type: &str,
        shape: ClaimShape,
        populator: Arc<dyn Populator>,
    ) -> Result<&mut Self, RegistryError> {
        let entry = self.entry(message_type, &shape)?;
        entry.shapes.push(shape);
        entry.populators.push(populator);
        Ok(self)
    }

    /// Declare a shape without a populator (another module fills it).
    pub fn declare(
        &mut self,
        message_type: &str,
        shape: ClaimShape,
    ) -> Result<&mut Self, RegistryError> {
        self.entry(message_type, &shape)?.shapes.push(shape);
        Ok(self)
    }

    pub fn install(&mut self, module: &dyn LtiModule) -> Result<&mut Self, RegistryError> {
        module.register(self)?;
        Ok(self)
    }

    fn entry(
        &mut self,
        message_type: &str,
        shape: &ClaimShape,
    ) -> Result<&mut PendingEntry, RegistryError> {
        if message_type.trim().is_empty() {
            return Err(RegistryError::EmptyMessageType);
        }
        validate_shape(shape)?;

        if !self.entries.contains_key(message_type) {
            self.order.push(message_type.to_string());
        }
        Ok(self.entries.entry(message_type.to_string()).or_default())
    }

    /// Validate the union of shapes for every message type and freeze the registry.
    pub fn seal(mut self) -> Result<Registry, RegistryError> {
        let mut entries = HashMap::with_capacity(self.entries.len());

        for message_type in &self.order {
            let Some(pending) = self.entries.remove(message_type) else {
                continue;
            };
            check_conflicts(message_type, &pending.shapes)?;

            debug!(
                message_type = %message_type,
                shapes = pending.shapes.len(),
                populators = pending.populators.len(),
                "registered LTI message type"
            );

            entries.insert(
                message_type.clone(),
                MessageTypeEntry {
                    message_type: message_type.clone(),
                    shapes: pending.shapes,
                    populators: pending.populators,
                    layout: OnceLock::new(),
                },
            );
        }

        Ok(Registry { entries })
    }
}

fn validate_shape(shape: &ClaimShape) -> Result<(), RegistryError> {
    for member in shape.members() {
        match member {
            ShapeMember::Operation(name) => {
                return Err(RegistryError::NonFieldMember {
                    shape: shape.name().to_string(),
                    member: name.clone(),
                });
            }
            ShapeMember::Field(field) if field.name.trim().is_empty() => {
                return Err(RegistryError::EmptyClaimName {
                    shape: shape.name().to_string(),
                });
            }
            ShapeMember::Field(_) => {}
        }
    }
    Ok(())
}

fn check_conflicts(message_type: &str, shapes: &[ClaimShape]) -> Result<(), RegistryError> {
    let mut kinds: HashMap<String, ClaimKind> = base_fields()
        .into_iter()
        .map(|f| (f.name, f.kind))
        .collect();

    for field in shapes.iter().flat_map(ClaimShape::fields) {
        match kinds.get(&field.name) {
            Some(&first) if first != field.kind => {
                return Err(RegistryError::ConflictingClaim {
                    message_type: message_type.to_string(),
                    claim: field.name.clone(),
                    first,
                    second: field.kind,
                });
            }
            Some(_) => {}
            None => {
                kinds.insert(field.name.clone(), field.kind);
            }
        }
    }
    Ok(())
}

struct MessageTypeEntry {
    message_type: String,
    shapes: Vec<ClaimShape>,
    populators: Vec<Arc<dyn Populator>>,
    layout: OnceLock<Arc<MessageLayout>>,
}

impl MessageTypeEntry {
    fn layout(&self) -> Arc<MessageLayout> {
        self.layout
            .get_or_init(|| {
                debug!(message_type = %self.message_type, "synthesizing claims container");
                Arc::new(MessageLayout::synthesize(&self.message_type, &self.shapes))
            })
            .clone()
    }
}

/// Sealed, read-only registry.
pub struct Registry {
    entries: HashMap<String, MessageTypeEntry>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("message_types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn is_registered(&self, message_type: &str) -> bool {
        self.entries.contains_key(message_type)
    }

    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn layout(&self, message_type: &str) -> Result<Arc<MessageLayout>, RegistryError> {
        self.entry(message_type).map(MessageTypeEntry::layout)
    }

    /// A fresh, empty container for the message type.
    pub fn instantiate(&self, message_type: &str) -> Result<LtiMessage, RegistryError> {
        self.layout(message_type).map(LtiMessage::new)
    }

    /// Run every populator registered for the container's message type.
    pub async fn populate(
        &self,
        message: &mut LtiMessage,
        scope: &MessageScope,
    ) -> Result<(), PopulateError> {
        let populators = self
            .entries
            .get(message.message_type())
            .map(|e| e.populators.as_slice())
            .unwrap_or_default();

        for populator in populators {
            debug!(populator = populator.name(), "running populator");
            populator.populate(message, scope).await?;
        }
        Ok(())
    }

    fn entry(&self, message_type: &str) -> Result<&MessageTypeEntry, RegistryError> {
        self.entries
            .get(message_type)
            .ok_or_else(|| RegistryError::NotImplemented(message_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomPermissions, Deployment, DisclosurePermissions, Tool, User};
    use crate::services::claims::UserScope;
    use serde_json::json;
    use std::collections::BTreeMap;

    const ENDPOINT: &str = "https://example.com/claim/endpoint";
    const MARKER: &str = "https://example.com/claim/marker";

    struct Endpoint;

    #[async_trait]
    impl Populator for Endpoint {
        fn name(&self) -> &'static str {
            "endpoint"
        }

        async fn populate(
            &self,
            message: &mut LtiMessage,
            scope: &MessageScope,
        ) -> Result<(), PopulateError> {
            message.set(ENDPOINT, json!({ "tool": scope.tool.client_id }))?;
            Ok(())
        }
    }

    /// Copies whatever `Endpoint` wrote, to prove ordering.
    struct Marker;

    #[async_trait]
    impl Populator for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }

        async fn populate(
            &self,
            message: &mut LtiMessage,
            _scope: &MessageScope,
        ) -> Result<(), PopulateError> {
            let seen = message.get(ENDPOINT).is_some();
            message.set(MARKER, seen)?;
            Ok(())
        }
    }

    fn scope() -> MessageScope {
        MessageScope {
            message_type: "TestRequest".into(),
            user: UserScope {
                user: User::new("u-1"),
                actual_user: None,
                anonymous: false,
            },
            tool: Tool {
                client_id: "tool-1".into(),
                name: "Tool".into(),
                login_url: "https://tool.example/login".into(),
                launch_url: "https://tool.example/launch".into(),
                deep_link_url: None,
                redirect_uris: vec![],
                key_set: None,
                service_scopes: vec![],
                disclosure: DisclosurePermissions::default(),
                custom_permissions: CustomPermissions::default(),
                custom: BTreeMap::new(),
            },
            deployment: Deployment {
                deployment_id: "d-1".into(),
                tool_client_id: "tool-1".into(),
                custom: BTreeMap::new(),
            },
            context: None,
            resource_link: None,
            message_hint: None,
        }
    }

    fn registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "TestRequest",
                ClaimShape::new("Endpoint").field(ENDPOINT, ClaimKind::Object),
                Arc::new(Endpoint),
            )
            .unwrap()
            .register(
                "TestRequest",
                ClaimShape::new("Marker").field(MARKER, ClaimKind::Boolean),
                Arc::new(Marker),
            )
            .unwrap();
        builder.seal().unwrap()
    }

    #[test]
    fn operation_members_fail_at_registration() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .register(
                "TestRequest",
                ClaimShape::new("Bad")
                    .field(ENDPOINT, ClaimKind::Object)
                    .operation("compute"),
                Arc::new(Endpoint),
            )
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::NonFieldMember { .. }));
    }

    #[test]
    fn conflicting_kinds_fail_at_seal() {
        let mut builder = RegistryBuilder::new();
        builder
            .declare(
                "TestRequest",
                ClaimShape::new("A").field(ENDPOINT, ClaimKind::Object),
            )
            .unwrap()
            .declare(
                "TestRequest",
                ClaimShape::new("B").field(ENDPOINT, ClaimKind::String),
            )
            .unwrap();
        assert!(matches!(
            builder.seal(),
            Err(RegistryError::ConflictingClaim { .. })
        ));
    }

    #[test]
    fn redeclaring_a_base_claim_with_another_kind_fails() {
        let mut builder = RegistryBuilder::new();
        builder
            .declare(
                "TestRequest",
                ClaimShape::new("A").field("exp", ClaimKind::String),
            )
            .unwrap();
        assert!(builder.seal().is_err());
    }

    #[test]
    fn unregistered_type_is_not_implemented() {
        let err = registry().instantiate("Unknown").unwrap_err();
        assert!(matches!(err, RegistryError::NotImplemented(t) if t == "Unknown"));
    }

    #[tokio::test]
    async fn populators_run_in_registration_order() {
        let registry = registry();
        let mut msg = registry.instantiate("TestRequest").unwrap();
        registry.populate(&mut msg, &scope()).await.unwrap();

        assert_eq!(msg.get(ENDPOINT), Some(&json!({ "tool": "tool-1" })));
        assert_eq!(msg.get(MARKER), Some(&json!(true)));
    }

    #[tokio::test]
    async fn layout_is_synthesized_once_under_concurrency() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.layout("TestRequest").unwrap() })
            })
            .collect();

        let mut layouts = Vec::new();
        for h in handles {
            layouts.push(h.await.unwrap());
        }
        assert!(layouts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
