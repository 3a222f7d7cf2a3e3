//! Cache-aside walkthrough
//!
//! Demonstrates cached lookups, write-through, versioned listing invalidation
//! and rate limiting against the configured store. Without any environment
//! the in-memory store is used.
//!
//! Run with:
//! ```bash
//! cargo run --example inventory_cache_demo
//! ```

use inventory_cache::cache::keys::{filter_hash, product_key, search_key, PRODUCTS};
use inventory_cache::{
    store, telemetry, CacheAside, CacheConfig, CacheError, EntityClass, FixedWindowRateLimiter,
    StoreConfig, SystemClock,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Product {
    sku: String,
    name: String,
    quantity: u32,
}

/// Stand-in for the document database
struct Catalog {
    reads: AtomicUsize,
}

impl Catalog {
    async fn find_product(&self, sku: &str) -> Result<Option<Product>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        Ok((sku == "SKU-001").then(|| Product {
            sku: sku.to_string(),
            name: "Torque wrench".to_string(),
            quantity: 14,
        }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("inventory_cache=debug,inventory_cache_demo=info");

    println!("🗄️  Inventory Cache Demo\n");

    let kv = store::connect(&StoreConfig::from_env()?).await?;
    let cache = CacheAside::with_config(kv.clone(), CacheConfig::resilient())?;
    let catalog = Catalog {
        reads: AtomicUsize::new(0),
    };

    // 1. Cache-aside lookups
    println!("1️⃣  Cached lookups");
    for attempt in 1..=3 {
        let product: Option<Product> = cache
            .get_or_set(&product_key("SKU-001"), EntityClass::Product.ttl(), || {
                catalog.find_product("SKU-001")
            })
            .await?;
        println!("   attempt {}: {:?}", attempt, product.map(|p| p.name));
    }
    println!("   catalog reads: {}\n", catalog.reads.load(Ordering::SeqCst));

    // 2. Absent entities are not cached
    println!("2️⃣  Missing products always reach the catalog");
    for _ in 0..2 {
        let missing: Option<Product> = cache
            .get_or_set(&product_key("SKU-404"), EntityClass::Product.ttl(), || {
                catalog.find_product("SKU-404")
            })
            .await?;
        println!("   SKU-404: {:?}", missing);
    }
    println!("   catalog reads: {}\n", catalog.reads.load(Ordering::SeqCst));

    // 3. Write-through after an update
    println!("3️⃣  Write-through");
    let restocked = Product {
        sku: "SKU-001".to_string(),
        name: "Torque wrench".to_string(),
        quantity: 40,
    };
    let event = cache
        .write_through(&[product_key("SKU-001")], &restocked, EntityClass::Product.ttl())
        .await?;
    println!("   {} refreshed {:?}\n", event.reason, event.keys);

    // 4. Versioned listing invalidation
    println!("4️⃣  Listing invalidation");
    let filters = filter_hash("category=tools&sort=name");
    let before = cache.listing_key(&PRODUCTS, 1, &filters).await?;
    cache
        .write_through(&[before.clone()], &vec!["SKU-001"], EntityClass::Listing.ttl())
        .await?;
    let event = cache.invalidate_collection(&PRODUCTS).await?;
    let after = cache.listing_key(&PRODUCTS, 1, &filters).await?;
    println!("   {}", event.reason);
    println!("   before: {}", before);
    println!("   after:  {}\n", after);

    println!("   search key: {}\n", search_key("torque wrench", 1));

    // 5. Rate limiting
    println!("5️⃣  Rate limiting (3 per minute)");
    let limiter = FixedWindowRateLimiter::new(kv, Arc::new(SystemClock));
    for request in 1..=5 {
        let decision = limiter
            .check("203.0.113.7", 3, Duration::from_secs(60))
            .await?;
        println!(
            "   request {}: allowed={} remaining={}",
            request, decision.allowed, decision.remaining
        );
    }

    println!("\n📊 {}", cache.stats());
    Ok(())
}
