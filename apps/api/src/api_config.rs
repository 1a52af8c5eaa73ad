use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tenantgate_core::AppError;
use tenantgate_infrastructure::{
    ContextCacheSettings, DEFAULT_CONTEXT_CAPACITY, DEFAULT_CONTEXT_TTL,
};
use tracing_subscriber::EnvFilter;

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "STORE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub _session_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub context_cache: ContextCacheSettings,
    pub dev_session_login: bool,
    pub dev_seed_owner: Option<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_owned())
            .parse::<StoreBackend>()?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required_env("DATABASE_URL")?),
            StoreBackend::Memory => env::var("DATABASE_URL").ok(),
        };
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let session_secret = required_env("SESSION_SECRET")?;
        if session_secret.len() < 32 {
            return Err(AppError::Validation(
                "SESSION_SECRET must be at least 32 characters".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cookie_secure = env_flag("SESSION_COOKIE_SECURE");

        let context_cache = ContextCacheSettings {
            ttl: Duration::from_secs(parse_env_u64(
                "CONTEXT_CACHE_TTL_SECONDS",
                DEFAULT_CONTEXT_TTL.as_secs(),
            )?),
            capacity: usize::try_from(parse_env_u64(
                "CONTEXT_CACHE_CAPACITY",
                u64::try_from(DEFAULT_CONTEXT_CAPACITY).unwrap_or(u64::MAX),
            )?)
            .map_err(|error| {
                AppError::Validation(format!("invalid CONTEXT_CACHE_CAPACITY value: {error}"))
            })?,
        };

        let dev_session_login = env_flag("DEV_SESSION_LOGIN");
        let dev_seed_owner = env::var("DEV_SEED_OWNER")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            migrate_only,
            store_backend,
            database_url,
            frontend_url,
            _session_secret: session_secret,
            api_host,
            api_port,
            cookie_secure,
            context_cache,
            dev_session_login,
            dev_seed_owner,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true")
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
