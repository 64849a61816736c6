use crate::record::CanonicalRecord;
use parking_lot::RwLock;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Bounded FIFO of records between producers and workers.
///
/// Producers never wait: [`enqueue`](Self::enqueue) drops the record when the
/// buffer is full or closed. Workers share the receiving end and poll it with
/// a timeout so they notice a stop request promptly.
///
/// An enqueue holds the `open` read lock until its send completes, so once
/// [`close`](Self::close) returns every accepted record is visible to
/// [`len`](Self::len).
pub struct Buffer {
    tx: mpsc::Sender<CanonicalRecord>,
    rx: Mutex<mpsc::Receiver<CanonicalRecord>>,
    open: RwLock<bool>,
}

impl Buffer {
    /// Create a closed buffer holding at most `capacity` records (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
            open: RwLock::new(false),
        }
    }

    /// Try to add a record without blocking.
    ///
    /// **Returns**
    /// - `true` if the record was queued.
    /// - `false` if the buffer is closed or at capacity; the record is dropped.
    pub fn enqueue(&self, record: CanonicalRecord) -> bool {
        let open = self.open.read();
        *open && self.tx.try_send(record).is_ok()
    }

    /// Wait up to `timeout` for the next record.
    pub async fn dequeue(&self, timeout: Duration) -> Option<CanonicalRecord> {
        tokio::time::timeout(timeout, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten()
    }

    /// Accept records from now on.
    pub fn open(&self) {
        *self.open.write() = true;
    }

    /// Reject further records. Queued ones stay available to `dequeue`.
    pub fn close(&self) {
        *self.open.write() = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
