//! Key-value store health checks
//!
//! Two methods are available:
//! - [`HealthCheckMethod::Ping`] sends `PING`; cheapest, suitable for load balancers
//! - [`HealthCheckMethod::RoundTrip`] writes a short-lived probe key and reads it
//!   back, proving that writes land and are visible to the same caller
//!
//! Health checks are diagnostics for operators. The cache and the rate limiter
//! never retry; only this module does.

use crate::error::CacheError;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Configuration for health check behavior
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Health check method to use
    pub method: HealthCheckMethod,
    /// Timeout for a single attempt
    pub timeout: Duration,
    /// Maximum number of retry attempts after the first one
    pub max_retries: u32,
    /// Delay between retry attempts
    pub retry_delay: Duration,
    /// Response time threshold for degraded state (in milliseconds)
    pub degraded_threshold_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            method: HealthCheckMethod::Ping,
            timeout: Duration::from_secs(2),
            max_retries: 2,
            retry_delay: Duration::from_millis(250),
            degraded_threshold_ms: 500,
        }
    }
}

/// Health check method variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckMethod {
    Ping,
    RoundTrip,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Store is responsive
    Healthy,
    /// Store is responsive but slow (above degraded threshold)
    Degraded,
    /// Store is not responsive or erroring
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code equivalent
    pub fn to_http_status_code(&self) -> u16 {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub backend: String,
    pub method: HealthCheckMethod,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    /// Number of retries made before this result
    pub retry_count: u32,
}

impl HealthCheckResult {
    fn from_attempt(
        outcome: Result<(), CacheError>,
        elapsed: Duration,
        backend: &str,
        config: &HealthCheckConfig,
    ) -> Self {
        let response_time_ms = elapsed.as_millis() as u64;
        let (status, error) = match outcome {
            Ok(()) if response_time_ms > config.degraded_threshold_ms => {
                (HealthStatus::Degraded, None)
            }
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        Self {
            status,
            backend: backend.to_string(),
            method: config.method,
            response_time_ms,
            timestamp: Utc::now(),
            error,
            retry_count: 0,
        }
    }
}

async fn attempt(store: &dyn KeyValueStore, config: &HealthCheckConfig) -> Result<(), CacheError> {
    let probe = async {
        match config.method {
            HealthCheckMethod::Ping => store.ping().await,
            HealthCheckMethod::RoundTrip => {
                let key = format!("health:probe:{}", Uuid::new_v4());
                let marker = format!("\"{}\"", Utc::now().timestamp_millis());
                store.set(&key, &marker, Duration::from_secs(5)).await?;

                match store.get(&key).await? {
                    Some(read) if read == marker => Ok(()),
                    Some(_) => Err(CacheError::StoreError(
                        "probe key read back a different value".to_string(),
                    )),
                    None => Err(CacheError::StoreError(
                        "probe key missing right after write".to_string(),
                    )),
                }
            }
        }
    };

    tokio::time::timeout(config.timeout, probe)
        .await
        .map_err(|_| CacheError::TimeoutError {
            timeout_ms: config.timeout.as_millis() as u64,
            context: "health check".to_string(),
        })?
}

/// Check the store, retrying unhealthy attempts as configured.
///
/// Never fails; errors are reported inside the result.
pub async fn check_store(store: &dyn KeyValueStore, config: &HealthCheckConfig) -> HealthCheckResult {
    let mut retry_count = 0;

    loop {
        debug!("Executing {:?} health check against {}", config.method, store.backend_name());

        let start = Instant::now();
        let outcome = attempt(store, config).await;
        let mut result =
            HealthCheckResult::from_attempt(outcome, start.elapsed(), store.backend_name(), config);
        result.retry_count = retry_count;

        if result.status.is_operational() || retry_count >= config.max_retries {
            return result;
        }

        retry_count += 1;
        warn!(
            "Health check failed (attempt {}/{}), retrying after {:?}: {}",
            retry_count,
            config.max_retries + 1,
            config.retry_delay,
            result.error.as_deref().unwrap_or("unknown error")
        );
        tokio::time::sleep(config.retry_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_health_status_http_codes() {
        assert_eq!(HealthStatus::Healthy.to_http_status_code(), 200);
        assert_eq!(HealthStatus::Degraded.to_http_status_code(), 200);
        assert_eq!(HealthStatus::Unhealthy.to_http_status_code(), 503);
    }

    #[test]
    fn test_health_status_operational() {
        assert!(HealthStatus::Healthy.is_operational());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }

    #[test]
    fn test_result_degraded_when_slow() {
        let config = HealthCheckConfig::default();
        let result =
            HealthCheckResult::from_attempt(Ok(()), Duration::from_millis(900), "memory", &config);
        assert_eq!(result.status, HealthStatus::Degraded);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_result_unhealthy_on_error() {
        let config = HealthCheckConfig::default();
        let result = HealthCheckResult::from_attempt(
            Err(CacheError::ConnectionError("refused".into())),
            Duration::from_millis(3),
            "rest",
            &config,
        );
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new(Arc::new(SystemClock));
        let config = HealthCheckConfig {
            method: HealthCheckMethod::RoundTrip,
            ..Default::default()
        };

        let result = check_store(&store, &config).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.backend, "memory");
        assert_eq!(result.retry_count, 0);
    }
}
