use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use super::{FetchError, NetResponse, message::Method};

/// A scripted answer for one request.
#[derive(Debug, Clone)]
pub struct Canned {
    result: Result<NetResponse, FetchError>,
    delay: Option<Duration>,
}

impl Canned {
    /// A response with the given status and raw body.
    pub fn json<B: ToString>(status: u16, body: B) -> Self {
        Self {
            result: Ok(NetResponse {
                status,
                body: body.to_string(),
            }),
            delay: None,
        }
    }

    /// A transport-level failure.
    pub fn error(err: FetchError) -> Self {
        Self {
            result: Err(err),
            delay: None,
        }
    }

    /// Holds the answer back for `delay` (measured on the tokio clock).
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct State {
    /// Answers per request; the last one is sticky
    routes: HashMap<String, VecDeque<Canned>>,
    calls: HashMap<String, usize>,
    posted: Vec<(String, serde_json::Value)>,
}

/// Mock implementation of the Net actor for testing purposes.
///
/// Requests are matched by method, URL and query pairs (in any order).
/// Several answers can be queued for the same request; they are served in
/// order and the last one keeps being served. Unscripted requests fail with
/// a [`FetchError::Network`].
#[derive(Debug, Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    pub fn new() -> Self {
        Default::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(method: Method, url: &str, query: &[(String, String)]) -> String {
        let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        format!("{method} {url}?{}", pairs.join("&"))
    }

    fn owned(query: &[(&str, &str)]) -> Vec<(String, String)> {
        query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Queues an answer for `GET url?query`.
    pub fn on_get(&self, url: &str, query: &[(&str, &str)], canned: Canned) {
        let key = Self::key(Method::Get, url, &Self::owned(query));
        self.state().routes.entry(key).or_default().push_back(canned);
    }

    /// Drops every queued answer for `GET url?query` and installs `canned`.
    pub fn replace_get(&self, url: &str, query: &[(&str, &str)], canned: Canned) {
        let key = Self::key(Method::Get, url, &Self::owned(query));
        self.state().routes.insert(key, VecDeque::from([canned]));
    }

    /// Queues an answer for `POST url`.
    pub fn on_post(&self, url: &str, canned: Canned) {
        let key = Self::key(Method::Post, url, &[]);
        self.state().routes.entry(key).or_default().push_back(canned);
    }

    /// How many times `GET url?query` was requested.
    pub fn get_calls(&self, url: &str, query: &[(&str, &str)]) -> usize {
        let key = Self::key(Method::Get, url, &Self::owned(query));
        self.state().calls.get(&key).copied().unwrap_or(0)
    }

    /// How many requests were made in total, scripted or not.
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Bodies of every POST, in order.
    pub fn posted(&self) -> Vec<(String, serde_json::Value)> {
        self.state().posted.clone()
    }

    async fn answer(&self, key: String) -> Result<NetResponse, FetchError> {
        let canned = {
            let mut state = self.state();
            *state.calls.entry(key.clone()).or_default() += 1;
            match state.routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        let Some(canned) = canned else {
            return Err(FetchError::network(format!("no mock response for {key}")));
        };
        if let Some(delay) = canned.delay {
            tokio::time::sleep(delay).await;
        }
        canned.result
    }

    pub async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<NetResponse, FetchError> {
        self.answer(Self::key(Method::Get, url, query)).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<NetResponse, FetchError> {
        self.state().posted.push((url.to_string(), body));
        self.answer(Self::key(Method::Post, url, &[])).await
    }
}
