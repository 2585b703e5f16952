use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::GhprsError;
use crate::event::Event;

/// Channel capacity between a producer task and its consumer. [`deliver`]
/// waits for the slot to drain again, so a send completes only once the
/// consumer has taken the value.
const CHANNEL_CAPACITY: usize = 1;

/// Consumer end of a producer task that reports items and errors on two
/// separate channels.
///
/// The producer owns both senders, so both channels close together when it
/// returns. Dropping the feed cancels the producer.
pub struct Feed<T> {
    items: Option<mpsc::Receiver<T>>,
    errors: Option<mpsc::Receiver<GhprsError>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl<T: Send + 'static> Feed<T> {
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<T>, mpsc::Sender<GhprsError>, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (item_tx, item_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(producer(item_tx, error_tx, cancel.clone()));

        Self {
            items: Some(item_rx),
            errors: Some(error_rx),
            cancel,
            task,
        }
    }

    /// Waits for the next item or error, whichever arrives first. A closed
    /// channel is dropped from the selection while the other is drained.
    pub async fn next(&mut self) -> Event<T> {
        loop {
            tokio::select! {
                item = recv(&mut self.items), if self.items.is_some() => match item {
                    Some(item) => return Event::Item(item),
                    None => self.items = None,
                },
                error = recv(&mut self.errors), if self.errors.is_some() => match error {
                    Some(error) => return Event::Error(error),
                    None => self.errors = None,
                },
                else => return Event::Done,
            }
        }
    }
}

async fn recv<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

impl<T> Drop for Feed<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Hands `value` to the consumer unless the feed was dropped first. Returns
/// once the consumer has received it, and whether the consumer is still
/// there.
pub async fn deliver<T>(tx: &mpsc::Sender<T>, value: T, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        taken = hand_off(tx, value) => taken,
    }
}

async fn hand_off<T>(tx: &mpsc::Sender<T>, value: T) -> bool {
    if tx.send(value).await.is_err() {
        return false;
    }
    // The single slot frees up only when the receiver takes `value`.
    tx.reserve().await.is_ok()
}
