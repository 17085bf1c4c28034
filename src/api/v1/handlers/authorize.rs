use axum::{
    Form,
    extract::{Query, State},
    response::Html,
};

use crate::api::v1::dto::authorize::AuthorizeParams;
use crate::error::AppError;
use crate::services::auth::{AuthorizationRequest, LaunchResponse};
use crate::state::AppState;

pub async fn authorize_get(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Html<String>, AppError> {
    authorize(&state, params).await
}

pub async fn authorize_post(
    State(state): State<AppState>,
    Form(params): Form<AuthorizeParams>,
) -> Result<Html<String>, AppError> {
    authorize(&state, params).await
}

async fn authorize(state: &AppState, params: AuthorizeParams) -> Result<Html<String>, AppError> {
    let req: AuthorizationRequest = params.into();
    let launch = state.authorize.authorize(&req).await?;
    Ok(Html(form_post(&launch)))
}

/// Auto-submitting `form_post` response.
fn form_post(launch: &LaunchResponse) -> String {
    let mut fields = format!(
        r#"<input type="hidden" name="id_token" value="{}"/>"#,
        escape(&launch.id_token)
    );
    if let Some(state) = &launch.state {
        fields.push_str(&format!(
            r#"<input type="hidden" name="state" value="{}"/>"#,
            escape(state)
        ));
    }

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html><head><meta charset=\"utf-8\"><title>Launching...</title></head>\n",
            "<body onload=\"document.forms[0].submit()\">\n",
            "<form method=\"post\" action=\"{action}\">{fields}",
            "<noscript><button type=\"submit\">Continue</button></noscript>",
            "</form>\n</body></html>\n"
        ),
        action = escape(&launch.redirect_uri),
        fields = fields,
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
