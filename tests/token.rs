mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::*;
use lti_platform::services::lti::scopes;

const TOKEN_PATH: &str = "/api/v1/lti/token";

async fn request_token(app: &TestApp, form: &[(&'static str, String)]) -> axum::response::Response {
    app.post_form(TOKEN_PATH, &as_pairs(form)).await
}

async fn expect_rejection(app: &TestApp, form: &[(&'static str, String)], error: &str) -> String {
    let res = request_token(app, form).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["error"], error);
    body["error_description"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn granted_scopes_are_the_intersection_in_request_order() {
    let app = app();
    let assertion = Assertion::new(CLIENT_ID).sign();
    let requested = format!(
        "{} {} {}",
        scopes::AGS_SCORE,
        scopes::AGS_LINEITEM,
        scopes::NRPS_CONTEXT_MEMBERSHIP_READONLY
    );

    let res = request_token(&app, &token_form(&assertion, &requested)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "no-store");

    let body = json_body(res).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 3600);
    let expected = format!(
        "{} {}",
        scopes::AGS_LINEITEM,
        scopes::NRPS_CONTEXT_MEMBERSHIP_READONLY
    );
    assert_eq!(body["scope"], expected.as_str());

    let access_token = body["access_token"].as_str().unwrap();
    let claims = app.verify(access_token, ISSUER).await;
    assert_eq!(claims["sub"], CLIENT_ID);
    assert_eq!(claims["scope"], expected.as_str());
    assert!(claims["jti"].is_string());
}

#[tokio::test]
async fn no_granted_scope_is_rejected() {
    let app = app();
    let assertion = Assertion::new(CLIENT_ID).sign();
    expect_rejection(
        &app,
        &token_form(&assertion, scopes::AGS_SCORE),
        "invalid_scope",
    )
    .await;
}

#[tokio::test]
async fn replayed_assertion_is_rejected() {
    let app = app();
    let form = token_form(&Assertion::new(CLIENT_ID).sign(), scopes::AGS_LINEITEM);

    assert_eq!(request_token(&app, &form).await.status(), StatusCode::OK);
    let description = expect_rejection(&app, &form, "invalid_request").await;
    assert_eq!(description, "jti has already been used and is not expired");
}

#[tokio::test]
async fn assertion_inside_leeway_is_still_single_use() {
    let app = app_with_leeway(60);
    let mut assertion = Assertion::new(CLIENT_ID);
    assertion.iat -= 65;
    assertion.exp = assertion.iat + 60;
    let form = token_form(&assertion.sign(), scopes::AGS_LINEITEM);

    assert_eq!(request_token(&app, &form).await.status(), StatusCode::OK);
    // Past any clamp to the assertion's own expiry.
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    let description = expect_rejection(&app, &form, "invalid_request").await;
    assert_eq!(description, "jti has already been used and is not expired");
}

#[tokio::test]
async fn concurrent_replays_issue_exactly_one_token() {
    let app = app();
    let form = token_form(&Assertion::new(CLIENT_ID).sign(), scopes::AGS_LINEITEM);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        let request = form_request(TOKEN_PATH, &as_pairs(&form));
        handles.push(tokio::spawn(async move {
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut ok = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn same_jti_from_another_tool_is_independent() {
    let app = app();
    let first = Assertion::new(CLIENT_ID);
    let mut second = Assertion::new(OTHER_CLIENT_ID);
    second.jti = first.jti.clone();

    let res = request_token(&app, &token_form(&first.sign(), scopes::AGS_LINEITEM)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = request_token(&app, &token_form(&second.sign(), scopes::AGS_LINEITEM)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_grant_type_is_unsupported() {
    let app = app();
    let form = token_form(&Assertion::new(CLIENT_ID).sign(), scopes::AGS_LINEITEM);
    let form = with(form, "grant_type", "authorization_code");
    let description = expect_rejection(&app, &form, "unsupported_grant_type").await;
    assert_eq!(description, "grant_type must be 'client_credentials'.");
}

#[tokio::test]
async fn assertion_must_be_self_issued() {
    let app = app();
    let mut assertion = Assertion::new(CLIENT_ID);
    assertion.sub = OTHER_CLIENT_ID.to_string();
    let description = expect_rejection(
        &app,
        &token_form(&assertion.sign(), scopes::AGS_LINEITEM),
        "invalid_grant",
    )
    .await;
    assert_eq!(description, "client assertion must be self-issued (iss == sub).");
}

#[tokio::test]
async fn unknown_client_is_rejected() {
    let app = app();
    let description = expect_rejection(
        &app,
        &token_form(&Assertion::new("nobody").sign(), scopes::AGS_LINEITEM),
        "invalid_grant",
    )
    .await;
    assert_eq!(description, "client is not registered.");
}

#[tokio::test]
async fn wrong_audience_is_rejected() {
    let app = app();
    let mut assertion = Assertion::new(CLIENT_ID);
    assertion.aud = "https://elsewhere.example/token".to_string();
    expect_rejection(
        &app,
        &token_form(&assertion.sign(), scopes::AGS_LINEITEM),
        "invalid_request",
    )
    .await;
}

#[tokio::test]
async fn expired_assertion_is_rejected() {
    let app = app();
    let mut assertion = Assertion::new(CLIENT_ID);
    assertion.iat -= 3600;
    assertion.exp = assertion.iat + 60;
    expect_rejection(
        &app,
        &token_form(&assertion.sign(), scopes::AGS_LINEITEM),
        "invalid_request",
    )
    .await;
}

#[tokio::test]
async fn missing_scope_is_rejected() {
    let app = app();
    let form = token_form(&Assertion::new(CLIENT_ID).sign(), "");
    let description = expect_rejection(&app, &form, "invalid_scope").await;
    assert_eq!(description, "scope is required.");
}

#[tokio::test]
async fn jwks_publishes_the_platform_key() {
    let app = app();
    let res = app.get("/api/v1/lti/jwks").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let key = &body["keys"][0];
    assert_eq!(key["kid"], PLATFORM_KID);
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["alg"], "RS256");
}

#[tokio::test]
async fn health_answers_on_both_paths() {
    let app = app();
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
    assert_eq!(app.get("/api/v1/health").await.status(), StatusCode::OK);
}
