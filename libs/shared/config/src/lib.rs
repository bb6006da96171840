use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scheduling_api_url: String,
    pub scheduling_api_token: Option<String>,
    pub redis_url: Option<String>,
    pub cart_storage_dir: Option<PathBuf>,
    pub http_timeout_seconds: u64,
    pub sync_max_retries: u32,
    pub sync_retry_delay_ms: u64,
    pub cart_event_capacity: usize,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            scheduling_api_url: env::var("SCHEDULING_API_URL")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_API_URL not set, using empty value");
                    String::new()
                }),
            scheduling_api_token: env::var("SCHEDULING_API_TOKEN").ok()
                .filter(|token| !token.is_empty()),
            redis_url: env::var("REDIS_URL").ok()
                .filter(|url| !url.is_empty()),
            cart_storage_dir: env::var("CART_STORAGE_DIR").ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            http_timeout_seconds: parse_or_default("HTTP_TIMEOUT_SECONDS", 15),
            sync_max_retries: parse_or_default("SYNC_MAX_RETRIES", 3),
            sync_retry_delay_ms: parse_or_default("SYNC_RETRY_DELAY_MS", 500),
            cart_event_capacity: parse_or_default("CART_EVENT_CAPACITY", 256),
            port: parse_or_default("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.redis_url.is_none() && config.cart_storage_dir.is_none() {
            warn!("Neither REDIS_URL nor CART_STORAGE_DIR set, carts will only live in memory");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.scheduling_api_url.is_empty()
    }

    pub fn has_persistent_storage(&self) -> bool {
        self.redis_url.is_some() || self.cart_storage_dir.is_some()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
