use anyhow::Context;
use tokio::sync::mpsc::Sender;

use crate::{
    ArcStr,
    app::config::{Config, USizeOpt},
    log::Log,
};

mod core;
mod error;
pub mod message;
mod mock;

pub use error::FetchError;
use message::Message;
pub use mock::{Canned, Mock as NetMock};

/// Status and raw body of an HTTP exchange that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetResponse {
    pub status: u16,
    pub body: String,
}

impl NetResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The networking actor that provides a thread-safe interface for network operations.
///
/// This enum represents either a real networking actor or a mock implementation
/// for testing purposes.
///
/// # Examples
/// ```ignore
/// let net = Net::spawn(config, log).await?;
/// let response = net.get(url, vec![("page".into(), "1".into())]).await?;
/// ```
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is cheap as it only
/// copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Net {
    /// A real networking actor that performs HTTP requests
    Actual(Sender<Message>),
    /// A mock implementation for testing
    Mock(NetMock),
}

impl From<NetMock> for Net {
    fn from(value: NetMock) -> Self {
        Self::Mock(value)
    }
}

impl Net {
    /// Creates a new networking instance and spawns its actor, using the
    /// configured timeout for every request.
    pub async fn spawn(config: Config, log: Log) -> anyhow::Result<Self> {
        let timeout = std::time::Duration::from_secs(config.usize(USizeOpt::Timeout).await as u64);
        let core = core::Core::new(log, timeout).context("Building the HTTP client")?;
        let (net, _) = core.spawn();
        Ok(net)
    }

    /// Performs an HTTP GET request. `query` pairs are URL-encoded and
    /// appended to `url`.
    pub async fn get(
        &self,
        url: ArcStr,
        query: Vec<(String, String)>,
    ) -> Result<NetResponse, FetchError> {
        match self {
            Net::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Get { url, query, tx })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Net::Mock(mock) => mock.get(&url, &query).await,
        }
    }

    /// Performs an HTTP POST request with a JSON body.
    pub async fn post_json(
        &self,
        url: ArcStr,
        body: serde_json::Value,
    ) -> Result<NetResponse, FetchError> {
        match self {
            Net::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::PostJson { url, body, tx })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Net::Mock(mock) => mock.post_json(&url, body).await,
        }
    }
}
