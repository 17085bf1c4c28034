/*
 * Responsibility
 * - Config読み込み → 依存生成 (store / registry / 鍵 / replay store) → Router 組み立て
 * - Middleware の適用 (request id / trace / security headers)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, http::HttpLimits};
use crate::repos::{PgPlatformStore, PlatformStore};
use crate::services::auth::factory;
use crate::services::lti::{ServiceUrls, builtin_registry};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,lti_platform=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting LTI platform in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, HttpLimits::from(&config));
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.addr, "failed to bind");
            AppError::Internal
        })?;
    axum::serve(listener, app).await.map_err(|e| {
        error!(error = %e, "server error");
        AppError::Internal
    })?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to connect to DATABASE_URL");
            AppError::Internal
        })?;

    let store: Arc<dyn PlatformStore> = Arc::new(PgPlatformStore::new(pool.clone()));

    // Unregistered types or conflicting shapes abort startup here.
    let registry = Arc::new(builtin_registry(
        store.clone(),
        ServiceUrls::new(&config.public_base_url),
    )?);
    let mut message_types: Vec<&str> = registry.message_types().collect();
    message_types.sort_unstable();
    tracing::info!(?message_types, "claims registry sealed");

    let keys = factory::build_key_store(config)?;
    let replay = factory::build_replay_store(config, pool).await?;

    let authorize = factory::build_authorization_service(
        config,
        store.clone(),
        registry,
        keys.clone(),
    );
    let token = factory::build_token_service(config, store, replay, keys.clone())?;

    Ok(AppState::new(Arc::new(authorize), Arc::new(token), keys))
}

pub fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    middleware::http::apply(router, limits)
}
