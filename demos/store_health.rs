//! Manual store health check
//!
//! Connects to the store configured in the environment and runs both health
//! check methods against it.
//!
//! ## Usage
//!
//! Set environment variables (optional, defaults to the in-memory store):
//! ```bash
//! export CACHE_BACKEND="redis"
//! export REDIS_URL="redis://localhost:6379"
//! # or
//! export KV_REST_API_URL="https://example-kv.upstash.io"
//! export KV_REST_API_TOKEN="..."
//! ```
//!
//! Run the example:
//! ```bash
//! cargo run --example store_health
//! ```

use inventory_cache::{
    check_store, store, telemetry, HealthCheckConfig, HealthCheckMethod, HealthCheckResult,
    StoreConfig,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("inventory_cache=debug,store_health=info");

    println!("=== Store Health Check ===\n");

    let config = StoreConfig::from_env()?;
    println!("Timeout: {:?}\n", config.timeout);

    println!("Test 1: Connecting...");
    let kv = match store::connect(&config).await {
        Ok(kv) => {
            println!("✓ Connected to {} store\n", kv.backend_name());
            kv
        }
        Err(e) => {
            println!("✗ Failed to connect: {}\n", e);
            println!("Please check the store URL and credentials.");
            return Err(e.into());
        }
    };

    println!("Test 2: PING...");
    let result = check_store(kv.as_ref(), &HealthCheckConfig::default()).await;
    print_result(&result);

    println!("Test 3: SET/GET round trip...");
    let round_trip = HealthCheckConfig {
        method: HealthCheckMethod::RoundTrip,
        timeout: Duration::from_secs(5),
        ..HealthCheckConfig::default()
    };
    let result = check_store(kv.as_ref(), &round_trip).await;
    print_result(&result);

    println!("Test 4: JSON output...");
    println!("{}\n", serde_json::to_string_pretty(&result)?);

    println!("=== Done ===");
    Ok(())
}

fn print_result(result: &HealthCheckResult) {
    println!("  Status: {:?}", result.status);
    println!("  HTTP status: {}", result.status.to_http_status_code());
    println!("  Response time: {}ms", result.response_time_ms);
    println!("  Retries: {}", result.retry_count);
    if let Some(error) = &result.error {
        println!("  Error: {}", error);
    }
    println!();
}
