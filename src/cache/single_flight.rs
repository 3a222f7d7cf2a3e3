//! In-flight fetch registry for coalescing concurrent misses
//!
//! The first caller to miss on a key becomes the leader and runs the origin
//! fetch. Callers that miss on the same key while the leader is running
//! become followers and wait for the leader's outcome instead of fetching.
//! The registry entry is removed when the leader finishes or is dropped, so
//! a cancelled leader releases its followers to fetch on their own.

use crate::cache::types::{CacheKey, CacheValue};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// What a leader hands to its followers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlightOutcome {
    /// The encoded value the leader fetched
    Found(CacheValue),
    /// The origin had nothing
    Empty,
    /// The leader's fetch failed
    Failed,
}

type Slot = watch::Receiver<Option<FlightOutcome>>;

#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    flights: Mutex<HashMap<CacheKey, Slot>>,
}

pub(crate) enum Flight<'a> {
    Leader(FlightLeader<'a>),
    Follower(Slot),
}

/// Held by the caller running the fetch; unregisters itself on drop
pub(crate) struct FlightLeader<'a> {
    registry: &'a SingleFlight,
    key: CacheKey,
    sender: watch::Sender<Option<FlightOutcome>>,
}

impl SingleFlight {
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the flight for `key`, starting one if none is running
    pub(crate) fn join(&self, key: &str) -> Flight<'_> {
        let mut flights = self.lock();

        if let Some(slot) = flights.get(key) {
            return Flight::Follower(slot.clone());
        }

        let (sender, receiver) = watch::channel(None);
        flights.insert(key.to_string(), receiver);

        Flight::Leader(FlightLeader {
            registry: self,
            key: key.to_string(),
            sender,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

impl FlightLeader<'_> {
    pub(crate) fn complete(self, outcome: FlightOutcome) {
        // No followers is fine
        let _ = self.sender.send(Some(outcome));
    }
}

impl Drop for FlightLeader<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

/// Wait for the leader. `None` means the leader was dropped before finishing.
pub(crate) async fn await_leader(mut slot: Slot) -> Option<FlightOutcome> {
    let outcome = slot.wait_for(Option::is_some).await.ok()?;
    outcome.clone()
}
