//! Resolves the key set a tool signs its client assertions with.
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Tool, ToolKeySet};

#[derive(Debug, Error)]
pub enum ToolKeyError {
    #[error("tool has no key set")]
    Missing,
    #[error("failed to fetch tool key set: {0}")]
    Fetch(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct ToolKeyResolver {
    http: reqwest::Client,
}

impl ToolKeyResolver {
    pub fn new(timeout: Duration) -> Result<Self, ToolKeyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Inline sets are returned as-is; URIs are fetched on every call.
    pub async fn key_set(&self, tool: &Tool) -> Result<JwkSet, ToolKeyError> {
        match &tool.key_set {
            None => Err(ToolKeyError::Missing),
            Some(ToolKeySet::Inline(set)) => Ok(set.clone()),
            Some(ToolKeySet::Uri(uri)) => {
                debug!(client_id = %tool.client_id, jwks_uri = %uri, "fetching tool key set");
                let set = self
                    .http
                    .get(uri)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<JwkSet>()
                    .await?;
                Ok(set)
            }
        }
    }
}
