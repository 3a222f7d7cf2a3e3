//! Configuration for the cache-aside coordinator

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the coordinator does when the key-value store fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorPolicy {
    /// Return the store error to the caller
    Propagate,
    /// Treat the failure as a miss: read errors go to the origin, write
    /// errors are logged and dropped
    FallThrough,
}

/// Configuration for [`crate::cache::CacheAside`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads expiry of entries written together; 0.0 keeps TTLs exact
    pub ttl_jitter: f64,

    /// Let concurrent misses on one key share a single origin fetch
    pub coalesce_misses: bool,

    /// Behaviour on key-value store failures
    pub on_store_error: StoreErrorPolicy,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_jitter: 0.0,
            coalesce_misses: false,
            on_store_error: StoreErrorPolicy::Propagate,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self, ttl: Duration) -> Duration {
        if self.ttl_jitter == 0.0 {
            return ttl;
        }

        let base_secs = ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

/// Preset configurations
impl CacheConfig {
    /// Every store failure reaches the caller, TTLs are exact, no coalescing
    pub fn strict() -> Self {
        Self::default()
    }

    /// Keep serving from the origin while the store is down, share
    /// concurrent misses, and spread expiry by 10%
    pub fn resilient() -> Self {
        Self {
            ttl_jitter: 0.10,
            coalesce_misses: true,
            on_store_error: StoreErrorPolicy::FallThrough,
            enable_metrics: true,
        }
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl_jitter: Option<f64>,
    coalesce_misses: Option<bool>,
    on_store_error: Option<StoreErrorPolicy>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable miss coalescing
    pub fn coalesce_misses(mut self, enable: bool) -> Self {
        self.coalesce_misses = Some(enable);
        self
    }

    /// Set the store failure policy
    pub fn on_store_error(mut self, policy: StoreErrorPolicy) -> Self {
        self.on_store_error = Some(policy);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            coalesce_misses: self.coalesce_misses.unwrap_or(defaults.coalesce_misses),
            on_store_error: self.on_store_error.unwrap_or(defaults.on_store_error),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_jitter, 0.0);
        assert!(!config.coalesce_misses);
        assert_eq!(config.on_store_error, StoreErrorPolicy::Propagate);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        let invalid = CacheConfig::builder().ttl_jitter(1.5).build();
        assert!(invalid.validate().is_err());

        let invalid = CacheConfig::builder().ttl_jitter(-0.1).build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .coalesce_misses(true)
            .on_store_error(StoreErrorPolicy::FallThrough)
            .enable_metrics(false)
            .build();

        assert!(config.coalesce_misses);
        assert_eq!(config.on_store_error, StoreErrorPolicy::FallThrough);
        assert!(!config.enable_metrics);
        assert_eq!(config.ttl_jitter, 0.0);
    }

    #[test]
    fn test_ttl_without_jitter_is_exact() {
        let config = CacheConfig::default();
        assert_eq!(
            config.ttl_with_jitter(Duration::from_secs(60)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_ttl_with_jitter() {
        let config = CacheConfig::builder().ttl_jitter(0.1).build();

        for _ in 0..50 {
            let ttl = config.ttl_with_jitter(Duration::from_secs(300));
            assert!(ttl.as_secs_f64() >= 270.0);
            assert!(ttl.as_secs_f64() <= 330.0);
        }
    }

    #[test]
    fn test_preset_configs() {
        let strict = CacheConfig::strict();
        assert_eq!(strict.on_store_error, StoreErrorPolicy::Propagate);

        let resilient = CacheConfig::resilient();
        assert!(resilient.coalesce_misses);
        assert_eq!(resilient.on_store_error, StoreErrorPolicy::FallThrough);
        assert!(resilient.validate().is_ok());
    }
}
