//! Fan-in of per-frame import progress
//!
//! Each frame that opted into progress reporting owns one bounded channel.
//! [`StatusAggregator::merge`] drains all of them concurrently into a single
//! channel that closes only after every input channel has closed.

use importer_common::types::{ImportStatus, ImportStatusUpdate};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Default capacity of each per-frame status channel
pub const DEFAULT_STATUS_BUFFER: usize = 1000;

/// Receiving half of one frame's progress channel
#[derive(Debug)]
pub struct StatusChannel {
    frame: String,
    rx: mpsc::Receiver<ImportStatusUpdate>,
}

impl StatusChannel {
    pub fn new(frame: impl Into<String>, rx: mpsc::Receiver<ImportStatusUpdate>) -> Self {
        Self {
            frame: frame.into(),
            rx,
        }
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }
}

/// Create a bounded progress channel for `frame`
///
/// The sender goes to the sink (see `FrameSpec::with_status_channel`), the
/// receiver to a [`StatusAggregator`].
pub fn status_channel(
    frame: impl Into<String>,
    capacity: usize,
) -> (mpsc::Sender<ImportStatusUpdate>, StatusChannel) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, StatusChannel::new(frame, rx))
}

/// Merges N progress channels into one arrival-ordered stream
#[derive(Debug)]
pub struct StatusAggregator {
    inputs: Vec<StatusChannel>,
    capacity: usize,
}

impl StatusAggregator {
    pub fn new(inputs: Vec<StatusChannel>) -> Self {
        Self {
            inputs,
            capacity: 1,
        }
    }

    /// Buffer size of the merged channel (at least 1)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Start one drain task per input plus a coordinator, returning the
    /// merged receiver
    ///
    /// Must be called from within a tokio runtime. The coordinator holds the
    /// last sender and drops it once every drain task has finished, so the
    /// merged channel closes exactly when all inputs have closed. With no
    /// inputs it closes immediately.
    pub fn merge(self) -> mpsc::Receiver<ImportStatus> {
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut drains = JoinSet::new();
        for input in self.inputs {
            drains.spawn(drain(input, tx.clone()));
        }

        tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Some(joined) = drains.join_next().await {
                match joined {
                    Ok(count) => forwarded += count,
                    Err(e) => warn!(error = %e, "Status drain task failed"),
                }
            }
            debug!(forwarded = forwarded, "All status channels closed");
            drop(tx);
        });

        rx
    }

    /// [`StatusAggregator::merge`] as a `Stream`
    pub fn into_stream(self) -> ReceiverStream<ImportStatus> {
        ReceiverStream::new(self.merge())
    }
}

/// Forward one input until its producer closes it
///
/// If the merged receiver is gone the input is still drained so the
/// producer never blocks on a full channel.
async fn drain(input: StatusChannel, out: mpsc::Sender<ImportStatus>) -> u64 {
    let StatusChannel { frame, mut rx } = input;
    let mut forwarded = 0;
    let mut observer_gone = false;

    while let Some(update) = rx.recv().await {
        if observer_gone {
            continue;
        }
        let status = ImportStatus {
            frame: frame.clone(),
            update,
        };
        if out.send(status).await.is_err() {
            debug!(frame = %frame, "Merged status receiver dropped");
            observer_gone = true;
        } else {
            forwarded += 1;
        }
    }

    forwarded
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn update(n: u64) -> ImportStatusUpdate {
        ImportStatusUpdate {
            thread_id: 0,
            slice: 0,
            imported_count: n,
            time: Duration::from_millis(n),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<ImportStatus>) -> Vec<ImportStatus> {
        let mut out = Vec::new();
        while let Some(status) = rx.recv().await {
            out.push(status);
        }
        out
    }

    #[tokio::test]
    async fn test_no_inputs_closes_immediately() {
        let merged = StatusAggregator::new(Vec::new()).merge();
        assert!(collect(merged).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_items_delivered_and_fifo_per_frame() {
        let mut senders = Vec::new();
        let mut channels = Vec::new();
        for (frame, count) in [("f0", 50u64), ("f1", 0), ("v0", 120)] {
            let (tx, ch) = status_channel(frame, 4);
            senders.push((tx, count));
            channels.push(ch);
        }

        let merged = StatusAggregator::new(channels).with_capacity(2).merge();

        for (tx, count) in senders {
            tokio::spawn(async move {
                for n in 0..count {
                    tx.send(update(n)).await.unwrap();
                }
            });
        }

        let received = collect(merged).await;
        assert_eq!(received.len(), 170);

        let mut per_frame: HashMap<String, Vec<u64>> = HashMap::new();
        for status in received {
            per_frame
                .entry(status.frame)
                .or_default()
                .push(status.update.imported_count);
        }
        assert_eq!(per_frame["f0"], (0..50).collect::<Vec<_>>());
        assert_eq!(per_frame["v0"], (0..120).collect::<Vec<_>>());
        assert!(!per_frame.contains_key("f1"));
    }

    #[tokio::test]
    async fn test_stays_open_until_last_input_closes() {
        let (tx_a, a) = status_channel("a", 8);
        let (tx_b, b) = status_channel("b", 8);
        let (tx_empty, empty) = status_channel("empty", 8);
        let mut merged = StatusAggregator::new(vec![a, b, empty]).merge();

        drop(tx_empty);
        tx_a.send(update(1)).await.unwrap();
        drop(tx_a);
        assert_eq!(merged.recv().await.unwrap().frame, "a");

        // b is still open, so nothing arrives and the channel stays open
        let pending = tokio::time::timeout(Duration::from_millis(50), merged.recv()).await;
        assert!(pending.is_err());

        tx_b.send(update(2)).await.unwrap();
        drop(tx_b);
        assert_eq!(merged.recv().await.unwrap().frame, "b");
        assert!(merged.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_observer_does_not_stall_producers() {
        let (tx, ch) = status_channel("f0", 1);
        let merged = StatusAggregator::new(vec![ch]).merge();
        drop(merged);

        for n in 0..100 {
            tokio::time::timeout(Duration::from_secs(1), tx.send(update(n)))
                .await
                .expect("producer blocked")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_into_stream() {
        use futures::StreamExt;

        let (tx, ch) = status_channel("f0", 2);
        let stream = StatusAggregator::new(vec![ch]).into_stream();
        tx.send(update(7)).await.unwrap();
        drop(tx);

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].update.imported_count, 7);
    }
}
