//! Tenantgate API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use tenantgate_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StoreBackend};
use crate::api_services::StoreAdapters;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url)
            if config.migrate_only || config.store_backend == StoreBackend::Postgres =>
        {
            Some(api_services::connect_and_migrate(database_url).await?)
        }
        _ => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let adapters = match (config.store_backend, pool.as_ref()) {
        (StoreBackend::Postgres, Some(pool)) => StoreAdapters::postgres(pool),
        (StoreBackend::Postgres, None) => {
            return Err(AppError::Validation("DATABASE_URL is required".to_owned()));
        }
        (StoreBackend::Memory, _) => StoreAdapters::in_memory(),
    };

    let app_state = api_services::build_app_state(
        adapters,
        config.context_cache,
        api_services::system_clock(),
        config.frontend_url.clone(),
        config.dev_session_login,
    );

    if let Some(owner) = config.dev_seed_owner.as_deref() {
        dev_seed::run(&app_state, owner).await?;
    }

    let router = api_router::build_router(app_state)?;
    let app = match (config.store_backend, pool) {
        (StoreBackend::Postgres, Some(pool)) => router.layer(
            api_services::build_postgres_session_layer(pool, config.cookie_secure).await?,
        ),
        _ => router.layer(api_services::build_memory_session_layer(
            config.cookie_secure,
        )),
    };

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        store_backend = ?config.store_backend,
        "tenantgate-api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
