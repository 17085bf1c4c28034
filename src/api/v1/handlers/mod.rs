pub mod authorize;
pub mod health;
pub mod jwks;
pub mod token;
