use std::{any::Any, marker::PhantomData, sync::Arc, time::Duration};

use tokio::{sync::watch, time::Instant};

use super::{
    EntrySnapshot, QueryClient, QueryFn, QueryKey, QueryStatus, retry::with_retry,
};
use crate::{log::Log, net::FetchError};

/// Per-binding fetch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// While false no fetch is ever issued
    pub enabled: bool,
    /// Cached data younger than this is served without a request
    pub stale_time: Duration,
    /// Keep showing the last key's data while a new key loads
    pub keep_previous_data: bool,
    /// Extra attempts after a failure, with exponential backoff
    pub retry: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: Duration::ZERO,
            keep_previous_data: false,
            retry: 0,
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn keep_previous_data(mut self, keep: bool) -> Self {
        self.keep_previous_data = keep;
        self
    }

    pub fn retry(mut self, retry: usize) -> Self {
        self.retry = retry;
        self
    }
}

/// What a view renders for a binding.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    /// No data to show yet and one is on its way
    pub is_loading: bool,
    /// A request for the bound key is in flight
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<FetchError>,
    /// `data` belongs to the key bound before the current one
    pub is_previous_data: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            is_error: self.is_error,
            error: self.error.clone(),
            is_previous_data: self.is_previous_data,
        }
    }
}

/// A view's binding to one cache key at a time.
///
/// Binding subscribes to the key and fetches when the entry is missing,
/// failed or stale. Dropping the binding (or [`deactivate`](Query::deactivate))
/// releases the subscription; the cached entry outlives it until garbage
/// collection.
///
/// # Examples
/// ```ignore
/// let query: Query<ArticleDetail> =
///     Query::bind(client, log, key, fetch, QueryOptions::default()).await;
/// match query.state().data { ... }
/// ```
pub struct Query<T> {
    client: QueryClient,
    log: Log,
    key: QueryKey,
    fetch: QueryFn,
    options: QueryOptions,
    rx: watch::Receiver<EntrySnapshot>,
    active: bool,
    /// Data of the last key that had some, for `keep_previous_data`
    previous: Option<Arc<T>>,
    /// The last bind (or rebind) issued a request of its own
    started: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Query<T> {
    pub async fn bind(
        client: QueryClient,
        log: Log,
        key: QueryKey,
        fetch: QueryFn,
        options: QueryOptions,
    ) -> Self {
        let rx = client.subscribe(&key).await;
        let mut query = Self {
            client,
            log,
            key,
            fetch,
            options,
            rx,
            active: true,
            previous: None,
            started: false,
            _marker: PhantomData,
        };
        query.started = query.fetch_if_needed().await;
        query
    }

    fn fetcher(&self) -> QueryFn {
        with_retry(
            self.fetch.clone(),
            self.options.retry,
            self.key.clone(),
            self.log.clone(),
        )
    }

    /// Returns whether a request was issued.
    async fn fetch_if_needed(&self) -> bool {
        if !self.active || !self.options.enabled {
            return false;
        }
        let due = {
            let snapshot = self.rx.borrow();
            snapshot.status != QueryStatus::Loading
                && (snapshot.data.is_none()
                    || snapshot.status == QueryStatus::Error
                    || snapshot.is_stale(Instant::now(), self.options.stale_time))
        };
        if due {
            // The outcome lands in the cache; whoever cares watches the entry
            let _ = self.client.start(&self.key, self.fetcher(), false).await;
        }
        due
    }

    /// Whether the last bind, key change or activation issued a request,
    /// as opposed to serving the cached entry as it was.
    pub fn started_fetch(&self) -> bool {
        self.started
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The current view-state. Cheap and synchronous: it reads the latest
    /// snapshot broadcast by the cache.
    pub fn state(&self) -> QueryState<T> {
        let snapshot = self.rx.borrow();
        let mut data = snapshot.data::<T>();
        let mut is_previous_data = false;
        if data.is_none() && self.options.keep_previous_data {
            if let Some(previous) = &self.previous {
                data = Some(previous.clone());
                is_previous_data = true;
            }
        }

        let is_fetching = snapshot.status == QueryStatus::Loading;
        let is_error = snapshot.status == QueryStatus::Error;
        let is_loading = data.is_none()
            && self.options.enabled
            && matches!(snapshot.status, QueryStatus::Idle | QueryStatus::Loading);

        QueryState {
            data,
            status: snapshot.status,
            is_loading,
            is_fetching,
            is_error,
            error: snapshot.error.clone(),
            is_previous_data,
        }
    }

    /// Fetches the bound key regardless of staleness and waits for the
    /// outcome. A request already in flight is superseded. Does nothing
    /// while the binding is disabled.
    pub async fn refetch(&self) -> QueryState<T> {
        if self.options.enabled {
            let settled = self.client.start(&self.key, self.fetcher(), true).await;
            let _ = settled.await;
        }
        self.state()
    }

    /// Like [`refetch`](Self::refetch) but returns as soon as the request is
    /// issued; cached data stays visible meanwhile. Returns whether a request
    /// was issued.
    pub async fn revalidate(&self) -> bool {
        if !self.active || !self.options.enabled {
            return false;
        }
        let _ = self.client.start(&self.key, self.fetcher(), true).await;
        true
    }

    /// Rebinds to another key. The old key loses this subscriber; with
    /// `keep_previous_data` its data stays visible until the new key has
    /// some of its own.
    pub async fn set_key(&mut self, key: QueryKey, fetch: QueryFn) {
        if key == self.key {
            return;
        }
        if self.options.keep_previous_data {
            let current = self.rx.borrow().data::<T>();
            if current.is_some() {
                self.previous = current;
            }
        } else {
            self.previous = None;
        }

        if self.active {
            self.client.unsubscribe(&self.key).await;
        }
        self.key = key;
        self.fetch = fetch;
        if self.active {
            self.rx = self.client.subscribe(&self.key).await;
            self.started = self.fetch_if_needed().await;
        }
    }

    /// Turning a binding on fetches right away if the data is due.
    pub async fn set_enabled(&mut self, enabled: bool) {
        let was_enabled = self.options.enabled;
        self.options.enabled = enabled;
        if enabled && !was_enabled {
            self.started = self.fetch_if_needed().await;
        }
    }

    /// Releases the subscription while keeping the binding around. The last
    /// state seen stays readable.
    pub async fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.client.unsubscribe(&self.key).await;
        }
    }

    /// Subscribes again and fetches if the data is due. Key changes made
    /// while inactive take effect here.
    pub async fn activate(&mut self) {
        if !self.active {
            self.active = true;
            self.rx = self.client.subscribe(&self.key).await;
            self.started = self.fetch_if_needed().await;
        }
    }

    /// Waits for the next change of the bound entry. Returns `false` once
    /// the entry is gone and no change can come anymore.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until the bound entry holds an outcome (success or error).
    ///
    /// Only meaningful while a fetch is running or done: an idle, disabled
    /// binding never settles.
    pub async fn settled(&mut self) -> QueryState<T> {
        let _ = self
            .rx
            .wait_for(|s| matches!(s.status, QueryStatus::Success | QueryStatus::Error))
            .await;
        self.state()
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        if self.active {
            self.client.release(self.key.clone());
        }
    }
}
