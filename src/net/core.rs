use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;

use super::{FetchError, Net, NetResponse, message::Message};
use crate::{ArcStr, log::Log};

const SCOPE: &str = "net";

/// The core of the networking system. Wraps a pooled [`reqwest`] client with
/// a fixed per-request timeout.
///
/// Requests are independent of each other, so every message is served in
/// its own task: two different resources are always fetched in parallel.
#[derive(Debug)]
pub struct Core {
    log: Log,
    client: Client,
}

impl Core {
    pub fn new(log: Log, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { log, client })
    }

    pub fn spawn(self) -> (Net, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let client = self.client.clone();
                let log = self.log.clone();
                match message {
                    Message::Get { url, query, tx } => {
                        tokio::spawn(async move {
                            log.info(SCOPE, format!("GET {url} {query:?}"));
                            let request = client.get(url.as_ref()).query(&query);
                            let res = send(request, &log, &url).await;
                            let _ = tx.send(res);
                        });
                    }
                    Message::PostJson { url, body, tx } => {
                        tokio::spawn(async move {
                            log.info(SCOPE, format!("POST {url}"));
                            let request = client.post(url.as_ref()).json(&body);
                            let res = send(request, &log, &url).await;
                            let _ = tx.send(res);
                        });
                    }
                }
            }
        });

        (Net::Actual(tx), handle)
    }
}

/// Sends the request and reads the whole body. Only transport failures are
/// errors here; status interpretation belongs to the caller.
async fn send(
    request: reqwest::RequestBuilder,
    log: &Log,
    url: &ArcStr,
) -> Result<NetResponse, FetchError> {
    let response = log.warn_on_error(SCOPE, request.send().await.map_err(FetchError::from))?;
    let status = response.status().as_u16();
    let body = log.warn_on_error(SCOPE, response.text().await.map_err(FetchError::from))?;
    if !(200..300).contains(&status) {
        log.warn(SCOPE, format!("{url} answered {status}"));
    }
    Ok(NetResponse { status, body })
}
