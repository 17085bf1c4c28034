//! Claims registry and composer.
//!
//! Feature modules describe the claims they need as [`ClaimShape`]s and fill them
//! through [`Populator`]s. The [`Registry`] merges every shape registered for a
//! message type into a single [`MessageLayout`] and hands out [`LtiMessage`]
//! containers built from it.
pub mod message;
pub mod names;
pub mod registry;
pub mod scope;
pub mod shape;

pub use message::{ClaimError, LtiMessage, MessageLayout};
pub use registry::{LtiModule, PopulateError, Populator, Registry, RegistryBuilder, RegistryError};
pub use scope::{MessageScope, UserScope};
pub use shape::{ClaimField, ClaimKind, ClaimShape, ShapeMember};
