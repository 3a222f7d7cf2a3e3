//! Invalidation records
//!
//! Nothing is ever deleted from the store. A mutation either overwrites the
//! affected entity keys (write-through) or bumps a collection's version
//! counter, which moves every future listing read to fresh keys while the
//! old pages age out on their own TTL.

use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why cached data was replaced
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entity keys overwritten with the value just written to the origin
    WriteThrough,

    /// Collection version counter advanced; older listing pages are orphaned
    VersionBump { collection: String, version: u64 },
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::WriteThrough => write!(f, "write-through"),
            InvalidationReason::VersionBump {
                collection,
                version,
            } => write!(f, "{} advanced to v{}", collection, version),
        }
    }
}

/// Record of one invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Keys written (write-through) or the version key bumped
    pub keys: Vec<CacheKey>,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, keys: Vec<CacheKey>) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            keys,
        }
    }

    /// New collection version, when this was a version bump
    pub fn version(&self) -> Option<u64> {
        match self.reason {
            InvalidationReason::VersionBump { version, .. } => Some(version),
            InvalidationReason::WriteThrough => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_reason_display() {
        assert_eq!(InvalidationReason::WriteThrough.to_string(), "write-through");

        let reason = InvalidationReason::VersionBump {
            collection: "products".to_string(),
            version: 4,
        };
        assert_eq!(reason.to_string(), "products advanced to v4");
    }

    #[test]
    fn test_invalidation_event() {
        let event = InvalidationEvent::new(
            InvalidationReason::WriteThrough,
            vec!["order:1".to_string(), "order:by-number:1001".to_string()],
        );
        assert_eq!(event.keys.len(), 2);
        assert_eq!(event.version(), None);

        let event = InvalidationEvent::new(
            InvalidationReason::VersionBump {
                collection: "products".to_string(),
                version: 2,
            },
            vec!["products:version".to_string()],
        );
        assert_eq!(event.version(), Some(2));
    }
}
