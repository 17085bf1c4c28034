use axum::{Json, extract::State};
use jsonwebtoken::jwk::JwkSet;
use tracing::error;

use crate::error::AppError;
use crate::state::AppState;

/// Public keys tools use to verify ID tokens and access tokens.
pub async fn jwks(State(state): State<AppState>) -> Result<Json<JwkSet>, AppError> {
    let set = state.keys.key_set().await.map_err(|e| {
        error!(error = %e, "failed to read platform key set");
        AppError::Internal
    })?;
    Ok(Json(set))
}
