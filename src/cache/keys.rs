//! Cache key naming scheme
//!
//! Every key this crate persists is derived here, so the formats stay stable
//! for anything that scans key prefixes:
//!
//! | Kind                | Format                                      |
//! |---------------------|---------------------------------------------|
//! | entity              | `<namespace>:<identifier>`                  |
//! | search page         | `search:<hash>:<page>`                      |
//! | version counter     | `<namespace>:version`                       |
//! | versioned listing   | `<namespace>:v<version>:<page>:<filterHash>`|
//! | rate-limit counter  | `ratelimit:<identity>:<bucket>`             |
//!
//! Free text is reduced with a 32-bit rolling hash (seed 5381, multiply by
//! 33, xor each UTF-16 code unit, wrapping) rendered in base 36. Two queries
//! can collide; the result is a well-formed but unrelated cached page served
//! for up to one TTL. At 32 bits that is rare enough to keep keys short.

use crate::cache::types::CacheKey;
use serde::{Deserialize, Serialize};
use std::fmt;

const HASH_SEED: u32 = 5381;
const HASH_MULTIPLIER: u32 = 33;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Entity class prefix of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Orders, keyed by identifier
    Order,

    /// Products, keyed by SKU
    Product,

    /// Stock quantity of a product, keyed by SKU
    Stock,

    /// Search result pages
    Search,

    User,
    Location,
    Invoice,

    /// Anything else
    Custom(String),
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Order => write!(f, "order"),
            Namespace::Product => write!(f, "product"),
            Namespace::Stock => write!(f, "stock"),
            Namespace::Search => write!(f, "search"),
            Namespace::User => write!(f, "user"),
            Namespace::Location => write!(f, "location"),
            Namespace::Invoice => write!(f, "invoice"),
            Namespace::Custom(s) => write!(f, "{}", s),
        }
    }
}

/// 32-bit multiply-xor rolling hash over the UTF-16 code units of `text`
pub fn rolling_hash(text: &str) -> u32 {
    text.encode_utf16().fold(HASH_SEED, |hash, unit| {
        hash.wrapping_mul(HASH_MULTIPLIER) ^ u32::from(unit)
    })
}

/// Lowercase base-36 rendering of `n`
pub fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(7);
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// Short digest of a free-text filter or query
pub fn filter_hash(text: &str) -> String {
    to_base36(rolling_hash(text))
}

/// `<namespace>:<identifier>`
pub fn entity_key(namespace: &Namespace, identifier: &str) -> CacheKey {
    format!("{}:{}", namespace, identifier)
}

pub fn order_key(order_id: &str) -> CacheKey {
    entity_key(&Namespace::Order, order_id)
}

/// Products are keyed by SKU so the key can be derived from domain data alone
pub fn product_key(sku: &str) -> CacheKey {
    entity_key(&Namespace::Product, sku)
}

pub fn stock_key(sku: &str) -> CacheKey {
    entity_key(&Namespace::Stock, sku)
}

/// Key of one page of search results for `query`
pub fn search_key(query: &str, page: u32) -> CacheKey {
    hashed_key(&Namespace::Search, query, &[u64::from(page)])
}

/// `<namespace>:<hash(text)>[:<n>...]`
pub fn hashed_key(namespace: &Namespace, text: &str, numbers: &[u64]) -> CacheKey {
    let mut key = format!("{}:{}", namespace, filter_hash(text));
    for n in numbers {
        key.push(':');
        key.push_str(&n.to_string());
    }
    key
}

/// `ratelimit:<identity>:<bucket>`
pub fn rate_limit_key(identity: &str, bucket: u64) -> CacheKey {
    format!("ratelimit:{}:{}", identity, bucket)
}

/// A collection whose cached listing pages are invalidated together by
/// bumping a version counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedCollection {
    namespace: &'static str,
}

pub const PRODUCTS: VersionedCollection = VersionedCollection::new("products");
pub const ORDERS: VersionedCollection = VersionedCollection::new("orders");
pub const INVOICES: VersionedCollection = VersionedCollection::new("invoices");

impl VersionedCollection {
    pub const fn new(namespace: &'static str) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Key of the collection's version counter
    pub fn version_key(&self) -> CacheKey {
        format!("{}:version", self.namespace)
    }

    /// Key of one listing page under a given version
    pub fn page_key(&self, version: u64, page: u32, filter_hash: &str) -> CacheKey {
        format!("{}:v{}:{}:{}", self.namespace, version, page, filter_hash)
    }
}

/// Builder for ad-hoc keys with query-style parameters
pub struct CacheKeyBuilder {
    namespace: Namespace,
    identifier: String,
    params: Vec<(String, String)>,
}

impl CacheKeyBuilder {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            identifier: String::new(),
            params: Vec::new(),
        }
    }

    /// Set the primary identifier
    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = id.into();
        self
    }

    /// Add a parameter to the key
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        let mut key = entity_key(&self.namespace, &self.identifier);

        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            key.push('?');
            key.push_str(&params.join("&"));
        }

        key
    }
}
