#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, jwk::JwkSet};
use rsa::{RsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts};
use serde::Serialize;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use lti_platform::app::build_router;
use lti_platform::middleware::http::HttpLimits;
use lti_platform::domain::{
    Context, CustomPermissions, Deployment, DisclosurePermissions, Membership, PlatformDescriptor,
    ResourceLink, Role, Tool, ToolKeySet, User,
};
use lti_platform::repos::{MemoryStore, PlatformStore};
use lti_platform::services::auth::{
    AuthorizationService, JwtIssuer, KeyStore, PemKeyStore, TokenService, ToolKeyResolver,
    client_assertion::ClientAssertionValidator, replay::CacheReplayStore,
};
use lti_platform::services::hints::{encode_login_hint, encode_message_hint};
use lti_platform::services::lti::{RESOURCE_LINK_REQUEST, ServiceUrls, builtin_registry, scopes};
use lti_platform::state::AppState;

pub const ISSUER: &str = "https://lms.example";
pub const PUBLIC_BASE_URL: &str = "https://lms.example/";
pub const TOKEN_AUDIENCE: &str = "https://lms.example/api/v1/lti/token";

pub const CLIENT_ID: &str = "tool-1";
pub const OTHER_CLIENT_ID: &str = "tool-2";
pub const DEPLOYMENT_ID: &str = "dep-1";
pub const OTHER_DEPLOYMENT_ID: &str = "dep-2";
pub const CONTEXT_ID: &str = "ctx-1";
pub const RESOURCE_LINK_ID: &str = "rl-1";
pub const USER_ID: &str = "u-1";
pub const LAUNCH_URL: &str = "https://tool.example/launch";

pub const TOOL_KID: &str = "tool-key-1";
pub const PLATFORM_KID: &str = "platform-key-1";

const PLATFORM_KEY_PEM: &str = include_str!("../fixtures/platform_key.pem");
const TOOL_KEY_PEM: &str = include_str!("../fixtures/tool_key.pem");

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub fn tool_jwks() -> JwkSet {
    let key = RsaPrivateKey::from_pkcs8_pem(TOOL_KEY_PEM).unwrap();
    serde_json::from_value(json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": TOOL_KID,
            "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        }]
    }))
    .unwrap()
}

/// The seeded tool registration; tests tweak it and `put_tool` it back.
pub fn tool(client_id: &str) -> Tool {
    Tool {
        client_id: client_id.to_string(),
        name: format!("Tool {client_id}"),
        login_url: "https://tool.example/login".to_string(),
        launch_url: LAUNCH_URL.to_string(),
        deep_link_url: Some("https://tool.example/deep-link".to_string()),
        redirect_uris: Vec::new(),
        key_set: Some(ToolKeySet::Inline(tool_jwks())),
        service_scopes: vec![
            scopes::AGS_LINEITEM.to_string(),
            scopes::NRPS_CONTEXT_MEMBERSHIP_READONLY.to_string(),
        ],
        disclosure: DisclosurePermissions {
            name: true,
            given_name: true,
            ..DisclosurePermissions::default()
        },
        custom_permissions: CustomPermissions::new(["User.id", "Context.id"]),
        custom: BTreeMap::from([
            ("uid".to_string(), "$User.id".to_string()),
            ("course".to_string(), "$Context.id".to_string()),
            ("mail".to_string(), "$Person.email.primary".to_string()),
        ]),
    }
}

pub fn context_in(id: &str, deployment_id: &str) -> Context {
    Context {
        id: id.to_string(),
        deployment_id: deployment_id.to_string(),
        label: Some("BIO101".to_string()),
        title: Some("Biology".to_string()),
        types: Vec::new(),
        orgs: Vec::new(),
        history: Vec::new(),
        grade_levels: Vec::new(),
    }
}

pub fn resource_link_in(id: &str, deployment_id: &str, context_id: &str) -> ResourceLink {
    ResourceLink {
        id: id.to_string(),
        deployment_id: deployment_id.to_string(),
        context_id: context_id.to_string(),
        title: Some("Quiz 1".to_string()),
        description: None,
        available_start: None,
        available_end: None,
        submission_start: None,
        submission_end: None,
        custom: BTreeMap::new(),
    }
}

fn seed(store: &MemoryStore) {
    store
        .put_tool(tool(CLIENT_ID))
        .put_tool(tool(OTHER_CLIENT_ID))
        .put_deployment(Deployment {
            deployment_id: DEPLOYMENT_ID.to_string(),
            tool_client_id: CLIENT_ID.to_string(),
            custom: BTreeMap::new(),
        })
        .put_deployment(Deployment {
            deployment_id: OTHER_DEPLOYMENT_ID.to_string(),
            tool_client_id: OTHER_CLIENT_ID.to_string(),
            custom: BTreeMap::new(),
        })
        .put_context(context_in(CONTEXT_ID, DEPLOYMENT_ID))
        .put_resource_link(resource_link_in(RESOURCE_LINK_ID, DEPLOYMENT_ID, CONTEXT_ID))
        .put_user(User {
            name: Some("Ada Lovelace".to_string()),
            given_name: Some("Ada".to_string()),
            email: Some("ada@example.edu".to_string()),
            locale: Some("en-GB".to_string()),
            ..User::new(USER_ID)
        })
        .put_membership(Membership {
            context_id: CONTEXT_ID.to_string(),
            user_id: USER_ID.to_string(),
            roles: vec![Role::Learner],
        })
        .put_platform(PlatformDescriptor {
            guid: "lms-guid".to_string(),
            name: Some("Example LMS".to_string()),
            description: None,
            url: Some(ISSUER.to_string()),
            contact_email: None,
            product_family_code: None,
            version: None,
        });
}

pub fn app() -> TestApp {
    app_with_leeway(0)
}

/// Like [`app`], with assertions accepted `leeway_seconds` past their `exp`.
pub fn app_with_leeway(leeway_seconds: u64) -> TestApp {
    let store = MemoryStore::new();
    seed(&store);

    let shared: Arc<dyn PlatformStore> = Arc::new(store.clone());
    let keys: Arc<dyn KeyStore> =
        Arc::new(PemKeyStore::from_pem(PLATFORM_KEY_PEM, Some(PLATFORM_KID.to_string())).unwrap());
    let registry =
        Arc::new(builtin_registry(shared.clone(), ServiceUrls::new(PUBLIC_BASE_URL)).unwrap());

    let authorize = AuthorizationService::new(
        shared.clone(),
        registry,
        JwtIssuer::new(ISSUER.to_string(), keys.clone()),
        300,
    );
    let token = TokenService::new(
        shared,
        ToolKeyResolver::new(Duration::from_secs(2)).unwrap(),
        ClientAssertionValidator::new(TOKEN_AUDIENCE, leeway_seconds),
        Arc::new(CacheReplayStore::in_memory()),
        JwtIssuer::new(ISSUER.to_string(), keys.clone()),
        3600,
    );

    TestApp {
        router: build_router(
            AppState::new(Arc::new(authorize), Arc::new(token), keys),
            HttpLimits::default(),
        ),
        store,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> Response {
        self.router
            .clone()
            .oneshot(form_request(uri, form))
            .await
            .unwrap()
    }

    /// Verifies `token` against the published JWKS, with `audience` as the expected `aud`.
    pub async fn verify(&self, token: &str, audience: &str) -> Value {
        let res = self.get("/api/v1/lti/jwks").await;
        assert_eq!(res.status(), StatusCode::OK);
        let jwks: JwkSet = serde_json::from_value(json_body(res).await).unwrap();

        let kid = jsonwebtoken::decode_header(token).unwrap().kid.unwrap();
        let jwk = jwks.find(&kid).expect("kid is published");
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[audience]);
        jsonwebtoken::decode::<Value>(token, &DecodingKey::from_jwk(jwk).unwrap(), &validation)
            .unwrap()
            .claims
    }
}

pub fn form_request(uri: &str, form: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub async fn text_body(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Value of a hidden input in a `form_post` page.
pub fn form_field(html: &str, name: &str) -> Option<String> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

pub fn login_hint(anonymous: bool) -> String {
    encode_login_hint(USER_ID, None, anonymous).unwrap()
}

pub fn resource_link_hint() -> String {
    encode_message_hint(
        RESOURCE_LINK_REQUEST,
        DEPLOYMENT_ID,
        Some(CONTEXT_ID),
        Some(RESOURCE_LINK_ID),
        None,
    )
    .unwrap()
}

/// A valid authentication request for `tool-1`; override fields per test.
pub fn launch_params(login_hint: String, message_hint: String) -> Vec<(&'static str, String)> {
    vec![
        ("scope", "openid".to_string()),
        ("response_type", "id_token".to_string()),
        ("response_mode", "form_post".to_string()),
        ("prompt", "none".to_string()),
        ("nonce", "n-0S6_WzA2Mj".to_string()),
        ("state", "af0ifjsldkj".to_string()),
        ("client_id", CLIENT_ID.to_string()),
        ("redirect_uri", LAUNCH_URL.to_string()),
        ("login_hint", login_hint),
        ("lti_message_hint", message_hint),
    ]
}

pub fn with(
    mut params: Vec<(&'static str, String)>,
    key: &'static str,
    value: &str,
) -> Vec<(&'static str, String)> {
    for (k, v) in params.iter_mut() {
        if *k == key {
            *v = value.to_string();
        }
    }
    params
}

pub fn query(params: &[(&'static str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

#[derive(Debug, Clone, Serialize)]
pub struct Assertion {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Assertion {
    pub fn new(client_id: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now,
            exp: now + 300,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn sign(&self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(TOOL_KID.to_string());
        let key = EncodingKey::from_rsa_pem(TOOL_KEY_PEM.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, self, &key).unwrap()
    }
}

pub fn token_form(assertion: &str, scope: &str) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "client_credentials".to_string()),
        (
            "client_assertion_type",
            "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_string(),
        ),
        ("client_assertion", assertion.to_string()),
        ("scope", scope.to_string()),
    ]
}

pub fn as_pairs<'a>(params: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    params.iter().map(|(k, v)| (*k, v.as_str())).collect()
}
