//! Configuration module for rental-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";
const DEV_WEBHOOK_SECRET: &str = "dev-only-webhook-secret-change-me";

#[derive(Debug, Clone)]
pub struct RentalConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub webhook: WebhookConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    fn from_lookup(var: &dyn Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let parse = |key: &str, default: u32| {
            var(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };
        Ok(Self {
            url: var("DATABASE_URL").ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
            })?,
            max_connections: parse("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: parse("DATABASE_MIN_CONNECTIONS", 2),
        })
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 shared secret used to verify bearer tokens.
    pub secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    pub tolerance_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: Option<String>,
    /// In-process time-to-live for memoised stats.
    pub stats_ttl_seconds: u64,
    /// `s-maxage` advertised to edge caches on stats responses.
    pub edge_max_age_seconds: u64,
    pub edge_stale_while_revalidate_seconds: u64,
}

impl CacheConfig {
    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl_seconds)
    }

    /// Value of the `Cache-Control` header sent with stats responses.
    pub fn edge_cache_control(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            self.edge_max_age_seconds, self.edge_stale_while_revalidate_seconds
        )
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: None,
            stats_ttl_seconds: 30,
            edge_max_age_seconds: 60,
            edge_stale_while_revalidate_seconds: 120,
        }
    }
}

impl RentalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.environment.is_prod();

        let backend = match env::var("CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => CacheBackendKind::Memory,
            "redis" => CacheBackendKind::Redis,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "CACHE_BACKEND must be 'memory' or 'redis', got '{}'",
                    other
                )))
            }
        };

        let redis_url = env::var("REDIS_URL").ok();
        if backend == CacheBackendKind::Redis && redis_url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "REDIS_URL is required when CACHE_BACKEND=redis"
            )));
        }

        let defaults = CacheConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "rental-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig::from_lookup(&|key| env::var(key).ok())?,
            jwt: JwtConfig {
                secret: Secret::new(get_secret("JWT_SECRET", DEV_JWT_SECRET, is_prod)?),
            },
            webhook: WebhookConfig {
                secret: Secret::new(get_secret("WEBHOOK_SECRET", DEV_WEBHOOK_SECRET, is_prod)?),
                tolerance_seconds: parse_env("WEBHOOK_TOLERANCE_SECONDS", 300),
            },
            cache: CacheConfig {
                backend,
                redis_url,
                stats_ttl_seconds: parse_env("STATS_CACHE_TTL_SECONDS", defaults.stats_ttl_seconds),
                edge_max_age_seconds: parse_env(
                    "EDGE_CACHE_MAX_AGE_SECONDS",
                    defaults.edge_max_age_seconds,
                ),
                edge_stale_while_revalidate_seconds: parse_env(
                    "EDGE_CACHE_STALE_WHILE_REVALIDATE_SECONDS",
                    defaults.edge_stale_while_revalidate_seconds,
                ),
            },
        })
    }
}

/// Settings for the invoice item backfill job. It never serves HTTP, so it
/// needs neither the JWT nor the webhook secret.
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    pub log_level: String,
    pub database: DatabaseConfig,
}

impl BackfillConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    fn from_lookup(var: &dyn Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            database: DatabaseConfig::from_lookup(var)?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn get_secret(key: &str, dev_default: &str, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        _ => {
            tracing::warn!("{} not set, using development default", key);
            Ok(dev_default.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn backfill_config_needs_only_the_database() {
        let config = BackfillConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://localhost/rentals"),
            ("APP_ENVIRONMENT", "prod"),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "postgres://localhost/rentals");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn backfill_config_requires_database_url() {
        let err = BackfillConfig::from_lookup(&lookup(&[("LOG_LEVEL", "debug")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn database_pool_sizes_are_overridable() {
        let config = DatabaseConfig::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://db/rentals"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("DATABASE_MIN_CONNECTIONS", "nope"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 2);
    }
}
