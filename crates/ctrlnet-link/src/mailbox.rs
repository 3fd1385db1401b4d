use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::error;

/// Bounded FIFO of inbound messages awaiting the consumer.
///
/// Overflow keeps the front and trims the back: when a push takes the queue
/// past capacity, messages are removed from the tail until it fits again,
/// which discards the message that was just pushed. Older, unread messages
/// survive. This matches the receiver's historical behavior and is kept on
/// purpose; switching to oldest-first eviction changes which commands run.
#[derive(Debug)]
pub struct Mailbox {
    capacity: usize,
    queue: Mutex<VecDeque<Bytes>>,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Queue a message, then trim from the tail while over capacity.
    ///
    /// Returns the number of messages removed by the trim.
    pub fn push(&self, message: Bytes) -> usize {
        let mut queue = self.lock();
        queue.push_back(message);

        let mut trimmed = 0;
        while queue.len() > self.capacity {
            error!(
                queued = queue.len(),
                capacity = self.capacity,
                "too many incoming messages to handle"
            );
            queue.pop_back();
            trimmed += 1;
        }
        trimmed
    }

    /// Remove and return the oldest message.
    pub fn pop(&self) -> Option<Bytes> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
