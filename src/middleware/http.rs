//! Transport middleware for the launch and token endpoints.
//!
//! - `x-request-id` generated when absent and echoed on the response
//! - one tracing span per request, keyed by method, path and request id
//! - body limit and global timeout from [`HttpLimits`]
//!
//! Failures raised by these layers are rendered as OAuth error bodies so tool
//! libraries parsing `error` keep working when the platform is slow.

use std::time::Duration;

use axum::{
    Json, Router,
    error_handling::HandleErrorLayer,
    http::{Request, StatusCode, header::HeaderName},
    response::{IntoResponse, Response},
};
use tower::{BoxError, ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{Span, info_span, warn};

use crate::config::Config;
use crate::error::ErrorResponse;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    pub body_limit_bytes: usize,
    pub timeout: Duration,
}

impl Default for HttpLimits {
    /// Launch forms and client assertions are a few KiB at most.
    fn default() -> Self {
        Self {
            body_limit_bytes: 64 * 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for HttpLimits {
    fn from(config: &Config) -> Self {
        Self {
            body_limit_bytes: config.http_body_limit_bytes,
            timeout: config.http_timeout,
        }
    }
}

/// The query string is left out: launch URLs carry user and context hints.
fn request_span<B>(req: &Request<B>) -> Span {
    let request_id = req
        .headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    info_span!(
        "http",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    )
}

async fn layer_error(err: BoxError) -> Response {
    let (status, error, description) = if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "temporarily_unavailable",
            "request timed out.",
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "internal server error",
        )
    };
    warn!(error = %err, status = status.as_u16(), "request failed in middleware");

    let body = ErrorResponse {
        error,
        error_description: description.to_string(),
        error_uri: None,
    };
    (status, Json(body)).into_response()
}

pub fn apply(router: Router, limits: HttpLimits) -> Router {
    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(layer_error))
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(RequestBodyLimitLayer::new(limits.body_limit_bytes))
        // Also bounds remote tool JWKS fetches made while handling the request.
        .layer(TimeoutLayer::new(limits.timeout));

    router.layer(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::header,
        routing::{get, post},
    };
    use tower::ServiceExt;

    fn router(limits: HttpLimits) -> Router {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "late"
                }),
            )
            .route("/echo", post(|body: String| async move { body }));
        apply(router, limits)
    }

    #[tokio::test]
    async fn request_id_is_generated_and_echoed() {
        let res = router(HttpLimits::default())
            .oneshot(Request::post("/echo").body(Body::from("x")).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));

        let res = router(HttpLimits::default())
            .oneshot(
                Request::post("/echo")
                    .header("x-request-id", "launch-42")
                    .body(Body::from("x"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()["x-request-id"], "launch-42");
    }

    #[tokio::test]
    async fn timeout_renders_an_oauth_error() {
        let limits = HttpLimits {
            timeout: Duration::from_millis(20),
            ..HttpLimits::default()
        };
        let res = router(limits)
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "temporarily_unavailable");
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let limits = HttpLimits {
            body_limit_bytes: 16,
            ..HttpLimits::default()
        };
        let res = router(limits)
            .oneshot(
                Request::post("/echo")
                    .header(header::CONTENT_LENGTH, "64")
                    .body(Body::from(vec![b'a'; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
