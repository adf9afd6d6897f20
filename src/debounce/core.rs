use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Instant,
};

use super::Debouncer;

/// Timer task of a [`Debouncer`]: holds the pending value and the single
/// re-armable deadline.
pub struct Core<T> {
    initial: T,
    delay: Duration,
}

impl<T> Core<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        Self { initial, delay }
    }

    pub fn spawn(self) -> (Debouncer<T>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<T>(crate::BUFFER_SIZE);
        let (out_tx, out_rx) = watch::channel(self.initial);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            let timer = tokio::time::sleep(delay);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(value) => {
                            pending = Some(value);
                            timer.as_mut().reset(Instant::now() + delay);
                        }
                        None => {
                            // Inputs are gone, but the last one still settles
                            if let Some(value) = pending.take() {
                                timer.as_mut().await;
                                emit(&out_tx, value);
                            }
                            break;
                        }
                    },
                    () = timer.as_mut(), if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            emit(&out_tx, value);
                        }
                    }
                }
            }
        });

        (
            Debouncer {
                sender: tx,
                output: out_rx,
            },
            handle,
        )
    }
}

fn emit<T: PartialEq>(out: &watch::Sender<T>, value: T) {
    out.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}
