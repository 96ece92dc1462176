//! Bounded single-producer/single-consumer inbox between the transport
//! worker and the UI thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::ingest::IngestEvent;

/// Drain batch cap: if more than this many entries accumulate between
/// notifies, the consumer splices the remainder back onto the queue and
/// re-notifies rather than processing an unbounded batch in one go.
pub const DEFAULT_BATCH_CAP: usize = 200;

/// Single-producer/single-consumer inbox. The producer (transport
/// worker) calls [`EtwQueue::push`]; the consumer (UI thread) calls
/// [`EtwQueue::drain`] on notify.
pub struct EtwQueue {
    queue: Mutex<VecDeque<IngestEvent>>,
    notify_tx: Sender<()>,
    stopped: AtomicBool,
}

impl EtwQueue {
    pub fn new(notify_tx: Sender<()>) -> Self {
        EtwQueue {
            queue: Mutex::new(VecDeque::new()),
            notify_tx,
            stopped: AtomicBool::new(false),
        }
    }

    /// Producer side. Observes whether the queue was empty *before* this
    /// push; if so, posts a single notify. The empty-check-before-signal
    /// rule means at most one pending notify is ever outstanding per
    /// drain cycle, suppressing flooding under high event rates.
    ///
    /// A no-op once [`EtwQueue::stop`] has been called: shutdown must
    /// guarantee no further notifies are posted.
    pub fn push(&self, event: IngestEvent) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let was_empty = {
            let mut queue = self.queue.lock();
            let was_empty = queue.is_empty();
            queue.push_back(event);
            was_empty
        };
        if was_empty {
            let _ = self.notify_tx.try_send(());
        }
    }

    /// Consumer side, called on notify. Moves the whole queue out under
    /// the lock; if it exceeds `batch_cap`, splices the tail back onto
    /// the front of the queue and posts another notify so the remainder
    /// is picked up on the next drain cycle.
    pub fn drain(&self, batch_cap: usize) -> Vec<IngestEvent> {
        let mut queue = self.queue.lock();
        if queue.len() <= batch_cap {
            return queue.drain(..).collect();
        }
        let remainder = queue.split_off(batch_cap);
        let batch: Vec<IngestEvent> = queue.drain(..).collect();
        *queue = remainder;
        drop(queue);
        if !self.stopped.load(Ordering::Acquire) {
            let _ = self.notify_tx.try_send(());
        }
        batch
    }

    /// Stops accepting further pushes. The caller (UI thread) should
    /// still call [`EtwQueue::drain`] once more afterwards to pick up
    /// anything pushed just before the stop, then discard the queue.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
