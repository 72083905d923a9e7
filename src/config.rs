use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::server::youtube::FallbackPolicy;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEARCH_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_WATCH_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_REGION: &str = "oaxaca";

/// Value shipped in the sample `.env`; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "tu_api_key_de_youtube_aqui";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub api_base: String,
    pub upstream_timeout: Duration,
    pub fallback: FallbackPolicy,
    pub search_history_limit: usize,
    pub watch_history_limit: usize,
    pub default_region: String,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fallback: FallbackPolicy::default(),
            search_history_limit: DEFAULT_SEARCH_HISTORY_LIMIT,
            watch_history_limit: DEFAULT_WATCH_HISTORY_LIMIT,
            default_region: DEFAULT_REGION.to_string(),
            static_dir: None,
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("YOUTUBE_API_KEY").filter(|k| k != PLACEHOLDER_API_KEY);
        if api_key.is_none() {
            info!("YOUTUBE_API_KEY not set, upstream searches will use the fallback policy");
        }

        let timeout_secs: u64 = parse_or("UPSTREAM_TIMEOUT_SECS", var("UPSTREAM_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            api_key,
            api_base: var("YOUTUBE_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            upstream_timeout: Duration::from_secs(timeout_secs),
            fallback: parse_or("VIDEO_FALLBACK", var("VIDEO_FALLBACK"), FallbackPolicy::default())?,
            search_history_limit: parse_or(
                "SEARCH_HISTORY_LIMIT",
                var("SEARCH_HISTORY_LIMIT"),
                DEFAULT_SEARCH_HISTORY_LIMIT,
            )?,
            watch_history_limit: parse_or(
                "WATCH_HISTORY_LIMIT",
                var("WATCH_HISTORY_LIMIT"),
                DEFAULT_WATCH_HISTORY_LIMIT,
            )?,
            default_region: var("DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            static_dir: var("STATIC_DIR").map(PathBuf::from),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!("Invalid {key} value: {e}");
                Err(ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.fallback, FallbackPolicy::Synthetic);
        assert_eq!(cfg.search_history_limit, 10);
        assert_eq!(cfg.watch_history_limit, 20);
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(10));
        assert_eq!(cfg.default_region, "oaxaca");
    }

    #[test]
    fn placeholder_key_counts_as_missing() {
        let cfg = config_from(&[("YOUTUBE_API_KEY", PLACEHOLDER_API_KEY)]).unwrap();
        assert!(cfg.api_key.is_none());

        let cfg = config_from(&[("YOUTUBE_API_KEY", "   ")]).unwrap();
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            ("PORT", "8081"),
            ("YOUTUBE_API_KEY", "abc123"),
            ("YOUTUBE_API_BASE", "http://127.0.0.1:9999/v3/"),
            ("VIDEO_FALLBACK", "empty"),
            ("SEARCH_HISTORY_LIMIT", "3"),
            ("STATIC_DIR", "/srv/www"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.api_key.as_deref(), Some("abc123"));
        assert_eq!(cfg.api_base, "http://127.0.0.1:9999/v3");
        assert_eq!(cfg.fallback, FallbackPolicy::Empty);
        assert_eq!(cfg.search_history_limit, 3);
        assert_eq!(cfg.static_dir, Some(PathBuf::from("/srv/www")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("VIDEO_FALLBACK", "sometimes")]).is_err());
        assert!(config_from(&[("UPSTREAM_TIMEOUT_SECS", "0")]).is_err());
    }
}
