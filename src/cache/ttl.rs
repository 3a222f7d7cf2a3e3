//! Time-to-live per entity class
//!
//! Data that changes often, or whose staleness is operationally risky (stock
//! counts), lives briefly. Master data lives longer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ORDER_TTL: Duration = Duration::from_secs(60);
pub const PRODUCT_TTL: Duration = Duration::from_secs(300);
pub const STOCK_LEVEL_TTL: Duration = Duration::from_secs(10);
pub const SEARCH_RESULTS_TTL: Duration = Duration::from_secs(180);
pub const LISTING_TTL: Duration = Duration::from_secs(180);

/// Kinds of cached data with their own lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// A single order
    Order,
    /// A single product
    Product,
    /// Only the stock quantity of a product
    StockLevel,
    /// One page of search results
    SearchResults,
    /// One page of a versioned collection listing
    Listing,
}

impl EntityClass {
    pub const fn ttl(self) -> Duration {
        match self {
            EntityClass::Order => ORDER_TTL,
            EntityClass::Product => PRODUCT_TTL,
            EntityClass::StockLevel => STOCK_LEVEL_TTL,
            EntityClass::SearchResults => SEARCH_RESULTS_TTL,
            EntityClass::Listing => LISTING_TTL,
        }
    }
}
