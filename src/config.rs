use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::info;

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_POOL_MAX_SIZE: u32 = 10;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_MIN_IDLE: u32 = 8;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;
const CACHE_TTL_SECONDS: usize = 300;

/// Process-wide settings, read once at start-up and passed to whoever needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// MySQL connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_pool_max_size: u32,
    /// Redis food-listing cache; disabled when absent.
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub url: String,
    pub pool_max_open: u32,
    pub pool_min_idle: u32,
    pub pool_max_lifetime: Duration,
    pub ttl_seconds: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache = match optional(&lookup, "REDIS_URL") {
            Some(url) => Some(CacheConfig {
                url,
                pool_max_open: parse_or(&lookup, "CACHE_POOL_MAX_OPEN", CACHE_POOL_MAX_OPEN)?,
                pool_min_idle: parse_or(&lookup, "CACHE_POOL_MIN_IDLE", CACHE_POOL_MIN_IDLE)?,
                pool_max_lifetime: Duration::from_secs(parse_or(
                    &lookup,
                    "CACHE_POOL_EXPIRE_SECONDS",
                    CACHE_POOL_EXPIRE_SECONDS,
                )?),
                ttl_seconds: parse_or(&lookup, "CACHE_TTL_SECONDS", CACHE_TTL_SECONDS)?,
            }),
            None => None,
        };

        Ok(Self {
            host: optional(&lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            database_url: optional(&lookup, "DATABASE_URL"),
            db_pool_max_size: parse_or(&lookup, "DB_POOL_MAX_SIZE", DEFAULT_DB_POOL_MAX_SIZE)?,
            cache,
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_pool_max_size, 10);
        assert_eq!(config.cache, None);
    }

    #[test]
    fn redis_url_enables_cache_with_pool_defaults() {
        let config = load(&[("REDIS_URL", "redis://127.0.0.1/"), ("CACHE_TTL_SECONDS", "30")]).unwrap();
        let cache = config.cache.unwrap();
        assert_eq!(cache.url, "redis://127.0.0.1/");
        assert_eq!(cache.pool_max_open, 16);
        assert_eq!(cache.pool_min_idle, 8);
        assert_eq!(cache.pool_max_lifetime, Duration::from_secs(60));
        assert_eq!(cache.ttl_seconds, 30);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
