use std::collections::HashMap;

use tokio::sync::oneshot;

use super::{key::QueryKey, store::EntrySnapshot};

/// Outcome of asking for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// A fetch for the key is already running; the caller waits for it
    Joined,
    /// The caller must run the fetch and report back with this sequence number
    Started(u64),
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    waiters: Vec<oneshot::Sender<EntrySnapshot>>,
}

/// Table of in-flight fetches, at most one per key.
///
/// Every started fetch gets a sequence number. A forced fetch on a key that
/// is already in flight supersedes the running one: the sequence moves on and
/// the old fetch's outcome is refused by [`settle`](InFlight::settle), so the
/// cache always reflects the newest request rather than the last to arrive.
/// Waiters are never lost on supersession; they receive the newest outcome.
#[derive(Debug, Default)]
pub struct InFlight {
    pending: HashMap<QueryKey, Pending>,
    next_seq: u64,
}

impl InFlight {
    pub fn new() -> Self {
        Default::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Registers `waiter` for the outcome of `key` and decides whether a new
    /// fetch has to run.
    pub fn begin(
        &mut self,
        key: &QueryKey,
        force: bool,
        waiter: oneshot::Sender<EntrySnapshot>,
    ) -> Begin {
        let seq = self.next_seq();
        match self.pending.get_mut(key) {
            Some(pending) => {
                pending.waiters.push(waiter);
                if !force {
                    return Begin::Joined;
                }
                pending.seq = seq;
            }
            None => {
                self.pending.insert(
                    key.clone(),
                    Pending {
                        seq,
                        waiters: vec![waiter],
                    },
                );
            }
        }
        Begin::Started(seq)
    }

    /// Closes the fetch `seq` of `key`. Returns the waiters to notify when
    /// `seq` is the current fetch, `None` when it was superseded (or never
    /// existed) and its outcome must be dropped.
    pub fn settle(
        &mut self,
        key: &QueryKey,
        seq: u64,
    ) -> Option<Vec<oneshot::Sender<EntrySnapshot>>> {
        if self.pending.get(key)?.seq != seq {
            return None;
        }
        self.pending.remove(key).map(|pending| pending.waiters)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64) -> QueryKey {
        QueryKey::new("articleDetail").param("id", id)
    }

    #[test]
    fn test_second_caller_joins() {
        let mut in_flight = InFlight::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();

        let Begin::Started(seq) = in_flight.begin(&key(1), false, tx1) else {
            panic!("first caller must start the fetch");
        };
        assert_eq!(in_flight.begin(&key(1), false, tx2), Begin::Joined);

        let waiters = in_flight.settle(&key(1), seq).unwrap();
        assert_eq!(waiters.len(), 2);
        assert!(!in_flight.contains(&key(1)));
    }

    #[test]
    fn test_different_keys_start_independently() {
        let mut in_flight = InFlight::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert!(matches!(in_flight.begin(&key(1), false, tx1), Begin::Started(_)));
        assert!(matches!(in_flight.begin(&key(2), false, tx2), Begin::Started(_)));
        assert_eq!(in_flight.len(), 2);
    }

    #[test]
    fn test_forced_fetch_supersedes() {
        let mut in_flight = InFlight::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();

        let Begin::Started(old) = in_flight.begin(&key(1), false, tx1) else {
            panic!("expected a new fetch");
        };
        let Begin::Started(new) = in_flight.begin(&key(1), true, tx2) else {
            panic!("forced fetch must start");
        };
        assert_ne!(old, new);

        // The older response lands first and is refused
        assert!(in_flight.settle(&key(1), old).is_none());
        assert!(in_flight.contains(&key(1)));

        let waiters = in_flight.settle(&key(1), new).unwrap();
        assert_eq!(waiters.len(), 2);
    }

    #[test]
    fn test_settle_unknown() {
        let mut in_flight = InFlight::new();
        assert!(in_flight.settle(&key(1), 1).is_none());
    }
}
