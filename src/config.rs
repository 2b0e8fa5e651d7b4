// src/config.rs
use log::warn;
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_WORLD_BANK_BASE_URL: &str = "http://api.worldbank.org";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub world_bank_base_url: String,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: DEFAULT_PORT,
            world_bank_base_url: DEFAULT_WORLD_BANK_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let port = parse_or(&lookup, "PORT", defaults.port);
        let world_bank_base_url = lookup("WORLD_BANK_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.world_bank_base_url);
        let timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS);

        AppConfig {
            port,
            world_bank_base_url,
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("${} is not valid ({:?}), defaulting to {}", key, raw, default);
            default
        }),
        None => default,
    }
}
