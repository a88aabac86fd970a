//! Credentials and roots for the billing API.
//!
//! A `Config` can be passed to a client directly or installed process-wide
//! with [`set_global`] / [`set_credentials`]. When nothing was installed,
//! [`global`] initializes from the environment on first use.

use std::env;
use std::sync::RwLock;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

pub const ENV_SUBDOMAIN: &str = "CHARGIFY_SUBDOMAIN";
pub const ENV_API_KEY: &str = "CHARGIFY_API_KEY";
pub const ENV_ENVIRONMENT: &str = "CHARGIFY_ENV";
pub const ENV_BASE_URL: &str = "CHARGIFY_BASE_URL";
pub const ENV_EVENTS_URL: &str = "CHARGIFY_EVENTS_URL";

const DEFAULT_ENVIRONMENT: &str = "production";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static GLOBAL: RwLock<Option<Config>> = RwLock::new(None);

/// Site credentials plus the two roots endpoints are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: String,
    pub subdomain: String,
    pub api_key: String,
    /// Root of the site API, `https://{subdomain}.chargify.com/` by default.
    pub base_url: String,
    /// Root of the event ingestion API, which lives on its own host.
    pub events_url: String,
    pub timeout: Duration,
}

impl Config {
    pub fn new(subdomain: &str, api_key: &str) -> Self {
        let subdomain = subdomain.trim().to_lowercase();
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            base_url: default_base_url(&subdomain),
            events_url: default_events_url(&subdomain),
            subdomain,
            api_key: api_key.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `CHARGIFY_SUBDOMAIN`, `CHARGIFY_API_KEY`, `CHARGIFY_ENV` and the
    /// optional root overrides. Missing credentials are logged, not rejected;
    /// [`Config::validate`] runs before every call.
    pub fn from_env() -> Self {
        let subdomain = env_or(ENV_SUBDOMAIN, "");
        if subdomain.is_empty() {
            warn!("{ENV_SUBDOMAIN} not provided");
        }
        let api_key = env_or(ENV_API_KEY, "");
        if api_key.is_empty() {
            warn!("{ENV_API_KEY} not provided");
        }

        let mut config = Config::new(&subdomain, &api_key)
            .with_environment(&env_or(ENV_ENVIRONMENT, DEFAULT_ENVIRONMENT));
        if let Ok(url) = env::var(ENV_BASE_URL) {
            if !url.is_empty() {
                config = config.with_base_url(&url);
            }
        }
        if let Ok(url) = env::var(ENV_EVENTS_URL) {
            if !url.is_empty() {
                config = config.with_events_url(&url);
            }
        }
        config
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_events_url(mut self, url: &str) -> Self {
        self.events_url = url.to_string();
        self
    }

    pub fn with_environment(mut self, environment: &str) -> Self {
        self.environment = environment.to_lowercase();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.subdomain.is_empty() {
            return Err(ApiError::InvalidConfig("subdomain is required".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ApiError::InvalidConfig("api key is required".to_string()));
        }
        Ok(())
    }
}

/// Installs `config` as the process-wide configuration.
pub fn set_global(config: Config) {
    let mut slot = GLOBAL.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(config);
}

/// Replaces the process-wide credentials and rebuilds both default roots,
/// keeping the environment and timeout of the current configuration.
pub fn set_credentials(subdomain: &str, api_key: &str) {
    let current = global();
    let config = Config::new(subdomain, api_key)
        .with_environment(&current.environment)
        .with_timeout(current.timeout);
    set_global(config);
}

/// The process-wide configuration, read from the environment if nothing was
/// installed yet.
pub fn global() -> Config {
    {
        let slot = GLOBAL.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(config) = slot.as_ref() {
            return config.clone();
        }
    }
    let mut slot = GLOBAL.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.get_or_insert_with(Config::from_env).clone()
}

fn default_base_url(subdomain: &str) -> String {
    format!("https://{subdomain}.chargify.com/")
}

fn default_events_url(subdomain: &str) -> String {
    format!("https://events.chargify.com/{subdomain}/")
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}
