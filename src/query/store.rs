use std::{any::Any, collections::HashMap, fmt::Debug, sync::Arc, time::Duration};

use tokio::{sync::watch, time::Instant};

use super::key::QueryKey;
use crate::net::FetchError;

/// Type-erased result of a fetch. Views recover the concrete type with
/// [`EntrySnapshot::data`].
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Where an entry is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Read-only copy of a cache entry.
#[derive(Clone, Default)]
pub struct EntrySnapshot {
    pub status: QueryStatus,
    /// Last successful payload, kept across later failures
    pub data: Option<Payload>,
    /// Last failure, cleared by the next success
    pub error: Option<FetchError>,
    pub fetched_at: Option<Instant>,
    pub subscriber_count: usize,
    /// Set by an explicit invalidation; the data counts as stale regardless
    /// of its age until the next success
    pub invalidated: bool,
}

impl Debug for EntrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySnapshot")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("fetched_at", &self.fetched_at)
            .field("subscriber_count", &self.subscriber_count)
            .field("invalidated", &self.invalidated)
            .finish()
    }
}

impl EntrySnapshot {
    /// The cached payload, if there is one and it has type `T`.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.data.clone()?.downcast::<T>().ok()
    }

    /// Data older than `stale_time` (or never fetched, or invalidated) is
    /// stale. A zero `stale_time` makes every success stale immediately.
    pub fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) >= stale_time,
            None => true,
        }
    }
}

/// A partial update of an entry.
#[derive(Clone)]
pub enum EntryPatch {
    /// A fetch cycle starts
    Loading,
    /// The cycle ends with data
    Success(Payload),
    /// The cycle ends with a failure; data stays untouched
    Error(FetchError),
}

impl Debug for EntryPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading"),
            Self::Success(_) => write!(f, "Success(..)"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}

#[derive(Debug)]
struct Entry {
    /// Holds the authoritative state; every change is broadcast to subscribers
    state: watch::Sender<EntrySnapshot>,
    /// Since when nobody is subscribed
    idle_since: Option<Instant>,
}

/// Keyed table of cached results.
///
/// The store is the only place entries are mutated. It is owned by the query
/// actor, so every mutation is serialized without locks; everybody else sees
/// snapshots, either on demand or through a [`watch::Receiver`].
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<QueryKey, Entry>,
}

impl Store {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        self.entries.get(key).map(|entry| entry.state.borrow().clone())
    }

    fn entry(&mut self, key: &QueryKey, now: Instant) -> &mut Entry {
        self.entries.entry(key.clone()).or_insert_with(|| Entry {
            state: watch::Sender::new(EntrySnapshot::default()),
            idle_since: Some(now),
        })
    }

    /// Merges `patch` into the entry, creating it if needed.
    ///
    /// `Loading` on an entry that is already loading changes nothing: a
    /// cycle cannot start twice. Returns whether the entry changed.
    pub fn set(&mut self, key: &QueryKey, patch: EntryPatch, now: Instant) -> bool {
        self.entry(key, now).state.send_if_modified(|state| match patch {
            EntryPatch::Loading => {
                if state.status == QueryStatus::Loading {
                    return false;
                }
                state.status = QueryStatus::Loading;
                true
            }
            EntryPatch::Success(data) => {
                state.status = QueryStatus::Success;
                state.data = Some(data);
                state.error = None;
                state.fetched_at = Some(now);
                state.invalidated = false;
                true
            }
            EntryPatch::Error(error) => {
                state.status = QueryStatus::Error;
                state.error = Some(error);
                true
            }
        })
    }

    /// Registers a subscriber and hands back a receiver of every future
    /// change to the entry.
    pub fn subscribe(&mut self, key: &QueryKey, now: Instant) -> watch::Receiver<EntrySnapshot> {
        let entry = self.entry(key, now);
        entry.idle_since = None;
        entry.state.send_modify(|state| state.subscriber_count += 1);
        entry.state.subscribe()
    }

    /// Drops a subscriber. Once the count reaches zero the grace period of
    /// [`evict_unused`](Store::evict_unused) starts.
    pub fn unsubscribe(&mut self, key: &QueryKey, now: Instant) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let mut count = 0;
        entry.state.send_modify(|state| {
            state.subscriber_count = state.subscriber_count.saturating_sub(1);
            count = state.subscriber_count;
        });
        if count == 0 {
            entry.idle_since = Some(now);
        }
    }

    /// Marks the entry stale. Returns `false` if there is no such entry.
    pub fn invalidate(&mut self, key: &QueryKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.state.send_modify(|state| state.invalidated = true);
        true
    }

    /// Removes entries nobody subscribed to for at least `grace`. Entries
    /// that are loading, or that `in_flight` reports as being fetched, always
    /// survive. Returns the evicted keys.
    pub fn evict_unused<F>(&mut self, now: Instant, grace: Duration, in_flight: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey) -> bool,
    {
        let evictable: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                let state = entry.state.borrow();
                state.subscriber_count == 0
                    && state.status != QueryStatus::Loading
                    && !in_flight(key)
                    && entry
                        .idle_since
                        .is_some_and(|since| now.saturating_duration_since(since) >= grace)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &evictable {
            self.entries.remove(key);
        }
        evictable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
