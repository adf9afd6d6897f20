//! Rate limiting of rapidly changing input.

use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc::Sender, watch};

mod core;

/// Turns a stream of raw values into a stream of settled ones.
///
/// Every [`set`](Debouncer::set) re-arms a timer of `delay`; the output only
/// takes the latest value once the timer fires without being superseded.
/// Setting the value the output already holds emits nothing.
///
/// # Examples
/// ```ignore
/// let mut keyword = Debouncer::spawn(String::new(), Duration::from_millis(300));
/// for typed in ["r", "ru", "rus", "rust"] {
///     keyword.set(typed.to_string()).await;
/// }
/// assert_eq!(keyword.changed().await.as_deref(), Some("rust"));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    sender: Sender<T>,
    output: watch::Receiver<T>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Spawns the timer task. The output starts at `initial`.
    pub fn spawn(initial: T, delay: Duration) -> Self {
        let (debouncer, _) = core::Core::new(initial, delay).spawn();
        debouncer
    }

    /// Feeds a new raw value.
    pub async fn set(&self, value: T) {
        self.sender
            .send(value)
            .await
            .context("Sending value to Debouncer")
            .expect("Debouncer actor died");
    }

    /// The latest settled value.
    pub fn value(&self) -> T {
        self.output.borrow().clone()
    }

    /// A receiver of every future emission.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        let mut rx = self.output.clone();
        rx.mark_unchanged();
        rx
    }

    /// Waits for the next emission. `None` once the timer task has stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.output.changed().await.ok()?;
        Some(self.output.borrow_and_update().clone())
    }
}
