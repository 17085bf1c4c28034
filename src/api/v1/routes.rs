/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /lti/authorize (GET/POST), /lti/token, /lti/jwks
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    authorize::{authorize_get, authorize_post},
    health::health,
    jwks::jwks,
    token::token,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/lti/authorize", get(authorize_get).post(authorize_post))
        .route("/lti/token", post(token))
        .route("/lti/jwks", get(jwks))
}
