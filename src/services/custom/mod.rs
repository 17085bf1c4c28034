//! Custom parameter substitution.
pub mod engine;
pub mod variables;

pub use engine::{SubstitutionError, merge_custom, substitute};
pub use variables::Variable;
