use axum::{Form, Json, extract::State};

use crate::api::v1::dto::token::{TokenParams, TokenResponse};
use crate::error::AppError;
use crate::services::auth::TokenRequest;
use crate::state::AppState;

pub async fn token(
    State(state): State<AppState>,
    Form(params): Form<TokenParams>,
) -> Result<Json<TokenResponse>, AppError> {
    let req: TokenRequest = params.into();
    let issued = state.token.issue(&req).await?;
    Ok(Json(issued.into()))
}
