use tokio::sync::{oneshot, watch};

use super::{
    QueryFn,
    key::QueryKey,
    store::{EntryPatch, EntrySnapshot, Payload},
};
use crate::net::FetchError;

/// Messages that can be sent to the query actor.
pub enum Message {
    Get {
        key: QueryKey,
        tx: oneshot::Sender<Option<EntrySnapshot>>,
    },
    Set {
        key: QueryKey,
        patch: EntryPatch,
    },
    Subscribe {
        key: QueryKey,
        tx: oneshot::Sender<watch::Receiver<EntrySnapshot>>,
    },
    Unsubscribe {
        key: QueryKey,
    },
    /// Starts (or joins) a fetch. The reply arrives once the entry is marked
    /// loading and carries the receiver of the settled snapshot.
    Run {
        key: QueryKey,
        fetch: QueryFn,
        force: bool,
        tx: oneshot::Sender<oneshot::Receiver<EntrySnapshot>>,
    },
    /// Outcome of the fetch `seq` of `key`, sent by the task that ran it
    Settle {
        key: QueryKey,
        seq: u64,
        result: Result<Payload, FetchError>,
    },
    Invalidate {
        key: QueryKey,
        tx: oneshot::Sender<bool>,
    },
    /// Sweeps unused entries; replies with the number evicted when asked
    EvictUnused {
        tx: Option<oneshot::Sender<usize>>,
    },
    Len {
        tx: oneshot::Sender<usize>,
    },
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get { key, .. } => write!(f, "Get({key})"),
            Self::Set { key, patch } => write!(f, "Set({key}, {patch:?})"),
            Self::Subscribe { key, .. } => write!(f, "Subscribe({key})"),
            Self::Unsubscribe { key } => write!(f, "Unsubscribe({key})"),
            Self::Run { key, force, .. } => write!(f, "Run({key}, force={force})"),
            Self::Settle { key, seq, .. } => write!(f, "Settle({key}, seq={seq})"),
            Self::Invalidate { key, .. } => write!(f, "Invalidate({key})"),
            Self::EvictUnused { .. } => write!(f, "EvictUnused"),
            Self::Len { .. } => write!(f, "Len"),
        }
    }
}
