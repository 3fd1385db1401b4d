use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Fan-out "data arrived" signal.
///
/// Carries no payload. Each observer holds a one-slot channel, so a burst of
/// completions collapses into a single pending wake-up; the mailbox stays the
/// source of truth.
#[derive(Debug, Default)]
pub(crate) struct DataSignal {
    observers: Mutex<Vec<SyncSender<()>>>,
}

impl DataSignal {
    pub(crate) fn subscribe(&self) -> Notifications {
        let (tx, rx) = mpsc::sync_channel(1);
        self.lock().push(tx);
        Notifications { rx }
    }

    /// Wake every observer. Observers that went away are pruned.
    pub(crate) fn raise(&self) {
        self.lock().retain(|tx| match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => false,
        });
    }

    /// Drop every observer so blocked waiters return.
    pub(crate) fn close(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SyncSender<()>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consumer side of a link's data-arrived signal.
#[derive(Debug)]
pub struct Notifications {
    rx: Receiver<()>,
}

impl Notifications {
    /// Block until data arrives. Returns false once the link is disposed.
    pub fn wait(&self) -> bool {
        self.rx.recv().is_ok()
    }

    /// Block until data arrives or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Consume a pending signal without blocking.
    pub fn try_wait(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }
}
