//! Platform-side LTI 1.3 launch and service-token core.
pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
