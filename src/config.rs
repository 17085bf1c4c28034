/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, LTI issuer, 署名鍵, TTL など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub database_url: String,
    pub valkey_url: Option<String>,

    pub issuer: String,
    pub public_base_url: String,
    pub token_audience: Option<String>,

    pub signing_key_pem: String,
    pub signing_key_id: Option<String>,

    pub id_token_ttl_seconds: u64,
    pub access_token_ttl_seconds: u64,
    pub assertion_leeway_seconds: u64,
    pub tool_jwks_timeout: Duration,

    pub http_body_limit_bytes: usize,
    pub http_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material or connection strings
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("issuer", &self.issuer)
            .field("public_base_url", &self.public_base_url)
            .field("valkey", &self.valkey_url.is_some())
            .finish()
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn unsigned(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = match optional("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let database_url = required("DATABASE_URL")?;
        let valkey_url = optional("VALKEY_URL");

        let issuer = required("LTI_ISSUER")?;
        let public_base_url = required("PUBLIC_BASE_URL")?;
        url::Url::parse(&public_base_url).map_err(|_| ConfigError::Invalid("PUBLIC_BASE_URL"))?;
        let token_audience = optional("TOKEN_AUDIENCE");

        let signing_key_pem = required("LTI_SIGNING_KEY_PEM")?.replace("\\n", "\n");
        let signing_key_id = optional("LTI_SIGNING_KEY_ID");

        Ok(Self {
            addr,
            app_env,
            database_url,
            valkey_url,
            issuer,
            public_base_url,
            token_audience,
            signing_key_pem,
            signing_key_id,
            id_token_ttl_seconds: unsigned("ID_TOKEN_TTL_SECONDS", 300)?,
            access_token_ttl_seconds: unsigned("ACCESS_TOKEN_TTL_SECONDS", 3600)?,
            assertion_leeway_seconds: unsigned("ASSERTION_LEEWAY_SECONDS", 60)?,
            tool_jwks_timeout: Duration::from_secs(unsigned("TOOL_JWKS_TIMEOUT_SECONDS", 5)?),
            http_body_limit_bytes: unsigned("HTTP_BODY_LIMIT_BYTES", 64 * 1024)? as usize,
            http_timeout: Duration::from_secs(unsigned("HTTP_TIMEOUT_SECONDS", 30)?),
        })
    }
}
