use std::fmt::Display;

use tokio::sync::oneshot::Sender;

use super::{FetchError, NetResponse};
use crate::ArcStr;

/// HTTP methods the content service is consumed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Messages that can be sent to a [`Net`](super::Net) actor.
#[derive(Debug)]
pub enum Message {
    /// Performs an HTTP GET request with the given query pairs
    Get {
        url: ArcStr,
        query: Vec<(String, String)>,
        tx: Sender<Result<NetResponse, FetchError>>,
    },
    /// Performs an HTTP POST request with a JSON body
    PostJson {
        url: ArcStr,
        body: serde_json::Value,
        tx: Sender<Result<NetResponse, FetchError>>,
    },
}
