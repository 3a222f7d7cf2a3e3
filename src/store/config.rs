//! Store connection configuration
//!
//! Loaded from the environment (and a `.env` file when present):
//!
//! | Variable                  | Meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `CACHE_BACKEND`           | `memory`, `rest` or `redis` (inferred)    |
//! | `KV_REST_API_URL`         | REST service base URL                     |
//! | `KV_REST_API_TOKEN`       | REST service bearer token                 |
//! | `REDIS_URL`               | Redis connection URL                      |
//! | `CACHE_STORE_TIMEOUT_MS`  | per-command network timeout (default 5000)|

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_BACKEND: &str = "CACHE_BACKEND";
pub const ENV_REST_URL: &str = "KV_REST_API_URL";
pub const ENV_REST_TOKEN: &str = "KV_REST_API_TOKEN";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_TIMEOUT_MS: &str = "CACHE_STORE_TIMEOUT_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Which key-value service to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum StoreBackend {
    /// In-process store; nothing survives a restart
    Memory,
    /// REST-accessed key-value service
    Rest { url: String, token: String },
    /// Direct Redis connection
    Redis { url: String },
}

/// Connection settings for the key-value store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Network timeout applied to every store command
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn rest(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Rest {
                url: url.into(),
                token: token.into(),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Redis { url: url.into() },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from the process environment, reading `.env` first if it exists
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let rest_url = var(ENV_REST_URL);
        let redis_url = var(ENV_REDIS_URL);

        let kind = match var(ENV_BACKEND) {
            Some(kind) => kind.to_lowercase(),
            None if rest_url.is_some() => "rest".to_string(),
            None if redis_url.is_some() => "redis".to_string(),
            None => "memory".to_string(),
        };

        let backend = match kind.as_str() {
            "memory" => StoreBackend::Memory,
            "rest" => StoreBackend::Rest {
                url: rest_url.ok_or_else(|| missing(ENV_REST_URL))?,
                token: var(ENV_REST_TOKEN).ok_or_else(|| missing(ENV_REST_TOKEN))?,
            },
            "redis" => StoreBackend::Redis {
                url: redis_url.ok_or_else(|| missing(ENV_REDIS_URL))?,
            },
            other => {
                return Err(CacheError::ConfigError(format!(
                    "unknown {} value: {}",
                    ENV_BACKEND, other
                )))
            }
        };

        let timeout = match var(ENV_TIMEOUT_MS) {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!("{} must be milliseconds, got {}", ENV_TIMEOUT_MS, raw))
            })?),
            None => DEFAULT_TIMEOUT,
        };

        let config = Self { backend, timeout };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(CacheError::ConfigError("timeout must be greater than 0".to_string()));
        }

        match &self.backend {
            StoreBackend::Rest { url, token } => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(CacheError::ConfigError(format!(
                        "REST store URL must be http(s): {}",
                        url
                    )));
                }
                if token.is_empty() {
                    return Err(CacheError::ConfigError("REST store token is empty".to_string()));
                }
            }
            StoreBackend::Redis { url } => {
                if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                    return Err(CacheError::ConfigError(format!(
                        "Redis URL must use redis:// or rediss://: {}",
                        url
                    )));
                }
            }
            StoreBackend::Memory => {}
        }

        Ok(())
    }
}

fn missing(name: &str) -> CacheError {
    CacheError::ConfigError(format!("{} is not set", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_to_memory() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_infers_rest_backend() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_REST_URL, "https://kv.example.com"),
            (ENV_REST_TOKEN, "secret"),
            (ENV_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(
            config.backend,
            StoreBackend::Rest {
                url: "https://kv.example.com".to_string(),
                token: "secret".to_string()
            }
        );
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_explicit_redis_backend() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_BACKEND, "Redis"),
            (ENV_REDIS_URL, "redis://localhost:6379"),
            (ENV_REST_URL, "https://ignored.example.com"),
        ]))
        .unwrap();

        assert_eq!(
            config.backend,
            StoreBackend::Redis {
                url: "redis://localhost:6379".to_string()
            }
        );
    }

    #[test]
    fn test_rest_requires_token() {
        let result = StoreConfig::from_lookup(lookup(&[(ENV_REST_URL, "https://kv.example.com")]));
        assert!(matches!(result, Err(CacheError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_unknown_backend_and_bad_timeout() {
        assert!(StoreConfig::from_lookup(lookup(&[(ENV_BACKEND, "memcached")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "0")])).is_err());
    }

    #[test]
    fn test_validate_urls() {
        assert!(StoreConfig::redis("http://localhost").validate().is_err());
        assert!(StoreConfig::rest("kv.example.com", "t").validate().is_err());
        assert!(StoreConfig::rest("https://kv.example.com", "t").validate().is_ok());
    }
}
