//! Client-side cache of remote resources.
//!
//! A single [`QueryClient`] actor owns every cache entry and the table of
//! in-flight fetches. Views bind to keys through [`Query`] controllers, which
//! subscribe to entries, decide when a fetch is due and expose the
//! materialized view-state.

use std::{any::Any, future::Future, sync::Arc, time::Duration};

use anyhow::Context;
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::{mpsc::Sender, oneshot, watch};

use crate::{log::Log, net::FetchError};

mod controller;
mod core;
mod dedup;
mod key;
mod message;
mod retry;
mod store;
#[cfg(test)]
mod tests;

pub use controller::{Query, QueryOptions, QueryState};
pub use key::{ParamValue, QueryKey};
pub use retry::{backoff, with_retry};
pub use store::{EntryPatch, EntrySnapshot, Payload, QueryStatus};

use message::Message;

/// A fetcher, callable any number of times, producing a type-erased payload.
pub type QueryFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, FetchError>> + Send + Sync>;

/// Wraps a typed async fetcher into a [`QueryFn`].
///
/// # Examples
/// ```ignore
/// let api = api.clone();
/// let fetch = query_fn(move || {
///     let api = api.clone();
///     async move { api.get_article(42).await }
/// });
/// ```
pub fn query_fn<T, F, Fut>(f: F) -> QueryFn
where
    T: Any + Send + Sync,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = f();
        async move { fut.await.map(|value| Arc::new(value) as Payload) }.boxed()
    })
}

/// Timing of cache garbage collection.
#[derive(Debug, Clone, Copy)]
pub struct GcPolicy {
    /// How long an entry must stay without subscribers before eviction
    pub gc_time: Duration,
    /// Period of the automatic sweep, zero disables it
    pub interval: Duration,
}

impl Default for GcPolicy {
    fn default() -> Self {
        Self {
            gc_time: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(60),
        }
    }
}

/// Handle to the query actor.
///
/// Constructed once at start-up and passed to whoever needs cached data.
/// Cloning is cheap as it only copies the channel sender.
#[derive(Debug, Clone)]
pub struct QueryClient {
    sender: Sender<Message>,
}

impl QueryClient {
    pub fn spawn(log: Log, gc: GcPolicy) -> Self {
        let (client, _) = core::Core::new(log, gc.gc_time, gc.interval).spawn();
        client
    }

    async fn send(&self, msg: Message) {
        self.sender
            .send(msg)
            .await
            .context("Sending message to Query actor")
            .expect("Query actor died");
    }

    /// Snapshot of the entry for `key`, if there is one.
    pub async fn get(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Get {
            key: key.clone(),
            tx,
        })
        .await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }

    /// Writes directly into the cache, creating the entry if needed.
    pub async fn set(&self, key: &QueryKey, patch: EntryPatch) {
        self.send(Message::Set {
            key: key.clone(),
            patch,
        })
        .await;
    }

    /// Shortcut for seeding the cache with known data.
    pub async fn set_data<T: Any + Send + Sync>(&self, key: &QueryKey, data: T) {
        self.set(key, EntryPatch::Success(Arc::new(data))).await;
    }

    /// Registers a subscriber of `key`. Pair with [`unsubscribe`](Self::unsubscribe).
    pub async fn subscribe(&self, key: &QueryKey) -> watch::Receiver<EntrySnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Subscribe {
            key: key.clone(),
            tx,
        })
        .await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }

    pub async fn unsubscribe(&self, key: &QueryKey) {
        self.send(Message::Unsubscribe { key: key.clone() }).await;
    }

    /// Unsubscribes without awaiting, for use in `Drop`.
    pub(crate) fn release(&self, key: QueryKey) {
        use tokio::sync::mpsc::error::TrySendError;
        if let Err(TrySendError::Full(msg)) = self.sender.try_send(Message::Unsubscribe { key }) {
            let sender = self.sender.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = sender.send(msg).await;
                });
            }
        }
    }

    /// Starts a fetch of `key`, or joins the one already running unless
    /// `force` is set. Returns once the entry is marked loading; the receiver
    /// yields the settled snapshot.
    pub async fn start(
        &self,
        key: &QueryKey,
        fetch: QueryFn,
        force: bool,
    ) -> oneshot::Receiver<EntrySnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Run {
            key: key.clone(),
            fetch,
            force,
            tx,
        })
        .await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }

    /// Fetches `key` (deduplicated) and waits for the outcome.
    ///
    /// Never fails: a failed fetch comes back as a snapshot with
    /// [`QueryStatus::Error`], carrying whatever data was cached before.
    pub async fn run(&self, key: &QueryKey, fetch: QueryFn) -> EntrySnapshot {
        self.start(key, fetch, false)
            .await
            .await
            .context("Awaiting fetch outcome from Query actor")
            .expect("Query actor died")
    }

    /// Like [`run`](Self::run), but always issues a new request, superseding
    /// any fetch in flight for the key.
    pub async fn refetch(&self, key: &QueryKey, fetch: QueryFn) -> EntrySnapshot {
        self.start(key, fetch, true)
            .await
            .await
            .context("Awaiting fetch outcome from Query actor")
            .expect("Query actor died")
    }

    /// Marks the entry stale so the next bind refetches it. Returns `false`
    /// when the key is not cached.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Invalidate {
            key: key.clone(),
            tx,
        })
        .await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }

    /// Runs an eviction sweep now and returns how many entries went away.
    pub async fn evict_unused(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(Message::EvictUnused { tx: Some(tx) }).await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Len { tx }).await;
        rx.await
            .context("Awaiting response from Query actor")
            .expect("Query actor died")
    }
}
