use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use super::*;
use crate::log::Log;

fn client() -> QueryClient {
    QueryClient::spawn(
        Log::mock(),
        GcPolicy {
            gc_time: Duration::from_secs(300),
            interval: Duration::ZERO,
        },
    )
}

/// Fetcher answering `value` after `delay`, counting its invocations.
fn counting<T>(calls: &Arc<AtomicUsize>, value: T, delay: Duration) -> QueryFn
where
    T: Clone + Send + Sync + 'static,
{
    let calls = calls.clone();
    query_fn(move || {
        let calls = calls.clone();
        let value = value.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    })
}

fn failing(calls: &Arc<AtomicUsize>) -> QueryFn {
    let calls = calls.clone();
    query_fn(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(FetchError::server(500, "boom"))
        }
    })
}

fn page(n: u32) -> QueryKey {
    QueryKey::new("articles").param("page", n).param("page_size", 20u32)
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_one_call() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting(&calls, "page one".to_string(), Duration::from_millis(100));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            let fetch = fetch.clone();
            // Same key, parameters given in another order
            let key = QueryKey::new("articles")
                .param("page_size", 20u32)
                .param("page", 1u32);
            tokio::spawn(async move { client.run(&key, fetch).await })
        })
        .collect();

    for handle in handles {
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.status, QueryStatus::Success);
        assert_eq!(snapshot.data::<String>().as_deref().map(String::as_str), Some("page one"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_keys_run_in_parallel() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting(&calls, 1u32, Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    let (first, second) = (page(1), page(2));
    let (a, b) = tokio::join!(
        client.run(&first, fetch.clone()),
        client.run(&second, fetch.clone())
    );
    assert_eq!(a.status, QueryStatus::Success);
    assert_eq!(b.status, QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_captured_and_keeps_data() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    client
        .run(&page(1), counting(&calls, "cached".to_string(), Duration::ZERO))
        .await;
    let snapshot = client.run(&page(1), failing(&calls)).await;

    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.error, Some(FetchError::server(500, "boom")));
    assert_eq!(snapshot.data::<String>().as_deref().map(String::as_str), Some("cached"));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetcher_settles_as_error() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let panicking = query_fn(|| async {
        if true {
            panic!("malformed payload");
        }
        Ok::<String, FetchError>(String::new())
    });

    let snapshot = tokio::time::timeout(Duration::from_secs(5), client.run(&page(1), panicking))
        .await
        .unwrap();
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert!(snapshot.error.is_some());

    // The key is not left loading: the next fetch goes through
    let fetch = counting(&calls, "page one".to_string(), Duration::ZERO);
    let snapshot = tokio::time::timeout(Duration::from_secs(5), client.run(&page(1), fetch))
        .await
        .unwrap();
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bind_respects_stale_time() {
    let client = client();
    let log = Log::mock();
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting(&calls, 42i64, Duration::from_millis(10));
    let options = QueryOptions::default().stale_time(Duration::from_secs(60));

    let mut query: Query<i64> =
        Query::bind(client.clone(), log.clone(), page(1), fetch.clone(), options).await;
    assert!(query.state().is_loading);
    let state = query.settled().await;
    assert_eq!(state.data.as_deref(), Some(&42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    drop(query);

    // Fresh: a second binding is served from cache
    tokio::time::advance(Duration::from_secs(30)).await;
    let query: Query<i64> =
        Query::bind(client.clone(), log.clone(), page(1), fetch.clone(), options).await;
    assert!(!query.state().is_fetching);
    assert_eq!(query.state().data.as_deref(), Some(&42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    drop(query);

    // Stale: shown immediately, refreshed in the background
    tokio::time::advance(Duration::from_secs(31)).await;
    let mut query: Query<i64> = Query::bind(client, log, page(1), fetch, options).await;
    let state = query.state();
    assert!(state.is_fetching);
    assert!(!state.is_loading);
    assert_eq!(state.data.as_deref(), Some(&42));
    query.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bind_retries_after_error() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().stale_time(Duration::from_secs(3600));

    let mut query: Query<String> =
        Query::bind(client.clone(), Log::mock(), page(1), failing(&calls), options).await;
    let state = query.settled().await;
    assert!(state.is_error);
    assert!(!state.is_loading);
    assert_eq!(state.data, None);
    drop(query);

    let fetch = counting(&calls, "ok".to_string(), Duration::ZERO);
    let mut query: Query<String> = Query::bind(client, Log::mock(), page(1), fetch, options).await;
    let state = query.settled().await;
    assert!(!state.is_error);
    assert_eq!(state.error, None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_binding_never_fetches() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting(&calls, 1u32, Duration::ZERO);

    let mut query: Query<u32> = Query::bind(
        client,
        Log::mock(),
        page(1),
        fetch,
        QueryOptions::default().enabled(false),
    )
    .await;
    let state = query.state();
    assert!(!state.is_loading);
    assert_eq!(state.status, QueryStatus::Idle);

    query.refetch().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    query.set_enabled(true).await;
    assert_eq!(query.settled().await.data.as_deref(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_keep_previous_data_between_keys() {
    let client = client();
    let log = Log::mock();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().keep_previous_data(true);

    let mut query: Query<u32> = Query::bind(
        client,
        log,
        page(1),
        counting(&calls, 1u32, Duration::from_millis(10)),
        options,
    )
    .await;
    query.settled().await;

    query
        .set_key(page(2), counting(&calls, 2u32, Duration::from_secs(1)))
        .await;
    let state = query.state();
    assert!(state.is_fetching);
    assert!(!state.is_loading);
    assert!(state.is_previous_data);
    assert_eq!(state.data.as_deref(), Some(&1));

    let state = query.settled().await;
    assert!(!state.is_previous_data);
    assert_eq!(state.data.as_deref(), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn test_without_keep_previous_data_new_key_loads() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut query: Query<u32> = Query::bind(
        client.clone(),
        Log::mock(),
        page(1),
        counting(&calls, 1u32, Duration::ZERO),
        QueryOptions::default(),
    )
    .await;
    query.settled().await;
    query
        .set_key(page(2), counting(&calls, 2u32, Duration::from_secs(1)))
        .await;

    let state = query.state();
    assert!(state.is_loading);
    assert_eq!(state.data, None);

    // The old key lost its subscriber but is still cached
    let old = client.get(&page(1)).await.unwrap();
    assert_eq!(old.subscriber_count, 0);
    assert_eq!(old.data::<u32>().as_deref(), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_refetch_keeps_subscriber_count() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().stale_time(Duration::from_secs(3600));

    let mut query: Query<u32> = Query::bind(
        client.clone(),
        Log::mock(),
        page(1),
        counting(&calls, 1u32, Duration::ZERO),
        options,
    )
    .await;
    query.settled().await;

    query.refetch().await;
    query.refetch().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.get(&page(1)).await.unwrap().subscriber_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_response_is_discarded() {
    let log = Log::mock();
    let client = QueryClient::spawn(log.clone(), GcPolicy::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::new("articleDetail").param("id", 42i64);

    // The first request is slow and answers with outdated content
    let slow = counting(&calls, "pending".to_string(), Duration::from_secs(5));
    let first = client.start(&key, slow, false).await;

    let fast = counting(&calls, "completed".to_string(), Duration::from_secs(1));
    let second = client.refetch(&key, fast).await;
    assert_eq!(second.data::<String>().as_deref().map(String::as_str), Some("completed"));

    // Whoever waited on the first request sees the newest outcome too
    let first = first.await.unwrap();
    assert_eq!(first.data::<String>().as_deref().map(String::as_str), Some("completed"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = client.get(&key).await.unwrap();
    assert_eq!(snapshot.data::<String>().as_deref().map(String::as_str), Some("completed"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let messages = log.get_messages().await.unwrap();
    assert!(messages
        .iter()
        .any(|m| m.message.starts_with("discarding superseded response")));
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_next_bind() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let fetch = counting(&calls, 7u32, Duration::ZERO);
    let options = QueryOptions::default().stale_time(Duration::from_secs(3600));

    client.run(&page(1), fetch.clone()).await;
    assert!(client.invalidate(&page(1)).await);
    assert!(!client.invalidate(&page(9)).await);

    let mut query: Query<u32> = Query::bind(client, Log::mock(), page(1), fetch, options).await;
    query.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_set_data_seeds_cache() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    client.set_data(&page(1), 5u32).await;

    let query: Query<u32> = Query::bind(
        client,
        Log::mock(),
        page(1),
        counting(&calls, 6u32, Duration::ZERO),
        QueryOptions::default().stale_time(Duration::from_secs(60)),
    )
    .await;
    assert_eq!(query.state().data.as_deref(), Some(&5));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_binding_is_evicted_after_grace() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut query: Query<u32> = Query::bind(
        client.clone(),
        Log::mock(),
        page(1),
        counting(&calls, 1u32, Duration::ZERO),
        QueryOptions::default(),
    )
    .await;
    query.settled().await;
    assert_eq!(client.evict_unused().await, 0);

    drop(query);
    assert_eq!(client.get(&page(1)).await.unwrap().subscriber_count, 0);
    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(client.evict_unused().await, 0);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(client.evict_unused().await, 1);
    assert_eq!(client.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_loading_entry_survives_sweep() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let settled = client
        .start(&page(1), counting(&calls, 1u32, Duration::from_secs(600)), false)
        .await;

    tokio::time::advance(Duration::from_secs(301)).await;
    assert_eq!(client.evict_unused().await, 0);
    assert_eq!(settled.await.unwrap().status, QueryStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweep() {
    let client = QueryClient::spawn(
        Log::mock(),
        GcPolicy {
            gc_time: Duration::from_secs(300),
            interval: Duration::from_secs(60),
        },
    );
    client.set_data(&QueryKey::new("stats"), 1u32).await;
    assert_eq!(client.len().await, 1);

    tokio::time::sleep(Duration::from_secs(361)).await;
    assert_eq!(client.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_and_activate() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default().stale_time(Duration::from_secs(60));

    let mut query: Query<u32> = Query::bind(
        client.clone(),
        Log::mock(),
        page(1),
        counting(&calls, 1u32, Duration::ZERO),
        options,
    )
    .await;
    query.settled().await;

    query.deactivate().await;
    assert!(!query.is_active());
    assert_eq!(client.get(&page(1)).await.unwrap().subscriber_count, 0);
    assert_eq!(query.state().data.as_deref(), Some(&1));

    query.activate().await;
    assert_eq!(client.get(&page(1)).await.unwrap().subscriber_count, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_option_applies_backoff() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let start = tokio::time::Instant::now();

    let mut query: Query<String> = Query::bind(
        client,
        Log::mock(),
        page(1),
        failing(&calls),
        QueryOptions::default().retry(2),
    )
    .await;
    let state = query.settled().await;
    assert!(state.is_error);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_changed_notifies_views() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut query: Query<u32> = Query::bind(
        client,
        Log::mock(),
        page(1),
        counting(&calls, 3u32, Duration::from_millis(50)),
        QueryOptions::default(),
    )
    .await;
    // Loading first, then the data
    while query.state().data.is_none() {
        assert!(query.changed().await);
    }
    assert_eq!(query.state().data.as_deref(), Some(&3));
}
