use std::{sync::Arc, time::Duration};

use futures::FutureExt;

use super::{QueryFn, QueryKey};
use crate::log::Log;

const SCOPE: &str = "query.retry";

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);

/// Delay before retry number `attempt` (0-based): 500ms doubling, capped at 8s.
pub fn backoff(attempt: usize) -> Duration {
    let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
    BASE_DELAY.saturating_mul(factor).min(MAX_DELAY)
}

/// Wraps `fetch` so that a failure is retried up to `retries` times before
/// the last error is returned. The wrapped fetcher still counts as a single
/// fetch for deduplication.
pub fn with_retry(fetch: QueryFn, retries: usize, key: QueryKey, log: Log) -> QueryFn {
    if retries == 0 {
        return fetch;
    }
    Arc::new(move || {
        let fetch = fetch.clone();
        let key = key.clone();
        let log = log.clone();
        async move {
            let mut attempt = 0;
            loop {
                match fetch().await {
                    Ok(data) => return Ok(data),
                    Err(err) if attempt < retries => {
                        let delay = backoff(attempt);
                        log.info(
                            SCOPE,
                            format!("{key} failed ({err}), retry {} in {delay:?}", attempt + 1),
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{net::FetchError, query::query_fn};

    #[test]
    fn test_backoff_schedule() {
        let ms = |a| backoff(a).as_millis();
        assert_eq!(ms(0), 500);
        assert_eq!(ms(1), 1000);
        assert_eq!(ms(2), 2000);
        assert_eq!(ms(3), 4000);
        assert_eq!(ms(4), 8000);
        assert_eq!(ms(5), 8000);
        assert_eq!(ms(64), 8000);
    }

    fn flaky(calls: Arc<AtomicUsize>, failures: usize) -> QueryFn {
        query_fn(move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(FetchError::network("reset"))
                } else {
                    Ok(n)
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Log::mock();
        let fetch = with_retry(flaky(calls.clone(), 2), 3, QueryKey::new("stats"), log.clone());

        let start = tokio::time::Instant::now();
        let data = fetch().await.unwrap();
        assert_eq!(*data.downcast::<usize>().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 500ms + 1000ms of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(2000));
        assert_eq!(log.get_messages().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = with_retry(flaky(calls.clone(), 10), 2, QueryKey::new("stats"), Log::mock());

        assert_eq!(fetch().await.unwrap_err(), FetchError::network("reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_passthrough() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = with_retry(flaky(calls.clone(), 1), 0, QueryKey::new("stats"), Log::mock());
        assert!(fetch().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
