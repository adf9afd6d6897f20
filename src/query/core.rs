use std::{panic::AssertUnwindSafe, time::Duration};

use futures::FutureExt;

use tokio::{
    sync::{
        mpsc::{self, WeakSender},
        oneshot,
    },
    task::JoinHandle,
    time::Instant,
};

use super::{
    QueryClient, QueryFn,
    dedup::{Begin, InFlight},
    key::QueryKey,
    message::Message,
    store::{EntryPatch, Store},
};
use crate::{log::Log, net::FetchError};

const SCOPE: &str = "query";

/// The query actor: owns the cache [`Store`] and the [`InFlight`] table and
/// is the only task that mutates them.
///
/// Fetches never run inside the actor. Each one is spawned and reports back
/// with a `Settle` message, so a slow request never delays other keys.
pub struct Core {
    log: Log,
    store: Store,
    in_flight: InFlight,
    /// How long an entry must stay unused before eviction
    gc_time: Duration,
    /// Period of the automatic sweep, zero disables it
    gc_interval: Duration,
}

impl Core {
    pub fn new(log: Log, gc_time: Duration, gc_interval: Duration) -> Self {
        Self {
            log,
            store: Store::new(),
            in_flight: InFlight::new(),
            gc_time,
            gc_interval,
        }
    }

    pub fn spawn(mut self) -> (QueryClient, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(crate::BUFFER_SIZE);
        let weak = tx.downgrade();

        if !self.gc_interval.is_zero() {
            tokio::spawn(sweep(weak.clone(), self.gc_interval));
        }

        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let now = Instant::now();
                match msg {
                    Message::Get { key, tx } => {
                        let _ = tx.send(self.store.get(&key));
                    }
                    Message::Set { key, patch } => {
                        self.store.set(&key, patch, now);
                    }
                    Message::Subscribe { key, tx } => {
                        let _ = tx.send(self.store.subscribe(&key, now));
                    }
                    Message::Unsubscribe { key } => {
                        self.store.unsubscribe(&key, now);
                    }
                    Message::Run {
                        key,
                        fetch,
                        force,
                        tx,
                    } => {
                        let (waiter, settled) = oneshot::channel();
                        self.run(key, fetch, force, waiter, &weak, now);
                        let _ = tx.send(settled);
                    }
                    Message::Settle { key, seq, result } => {
                        self.settle(key, seq, result, now);
                    }
                    Message::Invalidate { key, tx } => {
                        let _ = tx.send(self.store.invalidate(&key));
                    }
                    Message::EvictUnused { tx } => {
                        let in_flight = &self.in_flight;
                        let evicted = self
                            .store
                            .evict_unused(now, self.gc_time, |key| in_flight.contains(key));
                        if !evicted.is_empty() {
                            self.log
                                .info(SCOPE, format!("evicted {} unused entries", evicted.len()));
                        }
                        if let Some(tx) = tx {
                            let _ = tx.send(evicted.len());
                        }
                    }
                    Message::Len { tx } => {
                        let _ = tx.send(self.store.len());
                    }
                }
            }
        });

        (QueryClient { sender: tx }, handle)
    }

    fn run(
        &mut self,
        key: QueryKey,
        fetch: QueryFn,
        force: bool,
        waiter: oneshot::Sender<super::EntrySnapshot>,
        weak: &WeakSender<Message>,
        now: Instant,
    ) {
        let seq = match self.in_flight.begin(&key, force, waiter) {
            Begin::Joined => {
                self.log.info(SCOPE, format!("joining in-flight fetch of {key}"));
                return;
            }
            Begin::Started(seq) => seq,
        };

        self.log.info(SCOPE, format!("fetching {key} (seq {seq})"));
        self.store.set(&key, EntryPatch::Loading, now);

        let weak = weak.clone();
        let log = self.log.clone();
        tokio::spawn(async move {
            // A panicking fetcher settles like any other failure
            let result = match AssertUnwindSafe(async move { fetch().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    log.error(SCOPE, format!("fetcher of {key} panicked"));
                    Err(FetchError::network("fetcher panicked"))
                }
            };
            // Nobody left to report to when every client handle is gone
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(Message::Settle { key, seq, result }).await;
            }
        });
    }

    fn settle(
        &mut self,
        key: QueryKey,
        seq: u64,
        result: Result<super::Payload, FetchError>,
        now: Instant,
    ) {
        let Some(waiters) = self.in_flight.settle(&key, seq) else {
            self.log.warn(
                SCOPE,
                format!("discarding superseded response for {key} (seq {seq})"),
            );
            return;
        };

        let patch = match result {
            Ok(data) => EntryPatch::Success(data),
            Err(err) => {
                self.log.warn(SCOPE, format!("fetching {key} failed: {err}"));
                EntryPatch::Error(err)
            }
        };
        self.store.set(&key, patch, now);

        if let Some(snapshot) = self.store.get(&key) {
            for waiter in waiters {
                let _ = waiter.send(snapshot.clone());
            }
        }
    }
}

/// Periodically asks the actor to evict unused entries, for as long as it
/// has clients.
async fn sweep(weak: WeakSender<Message>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(tx) = weak.upgrade() else {
            break;
        };
        if tx.send(Message::EvictUnused { tx: None }).await.is_err() {
            break;
        }
    }
}
