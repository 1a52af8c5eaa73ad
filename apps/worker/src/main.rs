//! Tenantgate background worker: purges expired temporary grants.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tenantgate_application::{
    AuditDispatcher, AuthorizationService, GrantSweeper, PermissionInvalidator,
    TemporaryGrantService,
};
use tenantgate_core::{AppError, AppResult, SystemClock};
use tenantgate_infrastructure::{
    ContextCacheSettings, InMemoryOrganizationContextCache, PostgresApiKeyRepository,
    PostgresAuditRepository, PostgresOrganizationStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    sweep_interval_seconds: u64,
    run_once: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let sweeper = build_grant_sweeper(pool);

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        run_once = config.run_once,
        "tenantgate-worker started"
    );

    loop {
        if let Err(error) = sweeper.sweep_all().await {
            warn!(error = %error, "grant sweep failed");
        }

        if config.run_once {
            return Ok(());
        }

        tokio::time::sleep(Duration::from_secs(config.sweep_interval_seconds)).await;
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_grant_sweeper(pool: PgPool) -> GrantSweeper {
    let store = Arc::new(PostgresOrganizationStore::new(pool.clone()));
    let api_key_repository = Arc::new(PostgresApiKeyRepository::new(pool.clone()));
    let audit = AuditDispatcher::new(Arc::new(PostgresAuditRepository::new(pool)));
    // Expired grants never count toward permissions, so a process-local cache
    // going stale in the API after a sweep changes no decision.
    let cache = Arc::new(InMemoryOrganizationContextCache::new(
        ContextCacheSettings::default(),
    ));

    let authorization = AuthorizationService::new(
        store.clone(),
        cache.clone(),
        api_key_repository,
        Arc::new(SystemClock),
    );
    let invalidator = PermissionInvalidator::new(store.clone(), cache);
    let grants = TemporaryGrantService::new(authorization, store.clone(), invalidator, audit);

    GrantSweeper::new(store, grants)
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let sweep_interval_seconds = parse_env_u64("GRANT_SWEEP_INTERVAL_SECONDS", 300)?;
        let run_once = env::args().nth(1).as_deref() == Some("once");

        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "GRANT_SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            sweep_interval_seconds,
            run_once,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
