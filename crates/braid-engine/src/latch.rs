//! Completion tickets and the countdown latch.
//!
//! Both are released by dropping a token inside the job, so a job that
//! unwinds or is discarded unrun still releases its waiter.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender};

/// Handle on one submitted component update.
///
/// Returned by [`UpdateControls::update_component`](crate::UpdateControls::update_component).
/// Dropping it does not cancel the update; the tick still waits for it.
#[derive(Debug)]
pub struct Completion {
    rx: Receiver<()>,
}

/// Held by the job; dropping it completes the paired [`Completion`].
pub(crate) struct CompletionSignal {
    _tx: Sender<()>,
}

impl Completion {
    /// A ticket and the signal that completes it.
    pub(crate) fn pair() -> (CompletionSignal, Completion) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        (CompletionSignal { _tx: tx }, Completion { rx })
    }

    /// Block until the update has finished.
    pub fn wait(&self) {
        // Only disconnection ever arrives on this channel.
        let _ = self.rx.recv();
    }

    /// Whether the update has finished.
    pub fn is_done(&self) -> bool {
        matches!(
            self.rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }
}

/// Counter that blocks waiters until it reaches zero.
#[derive(Debug, Default)]
pub(crate) struct CountdownLatch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    fn count_guard(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the count by one and return a guard that lowers it on drop.
    pub fn enter(self: &Arc<Self>) -> LatchGuard {
        *self.count_guard() += 1;
        LatchGuard {
            latch: Arc::clone(self),
        }
    }

    /// A guard for a slot already counted at construction.
    pub fn guard(self: &Arc<Self>) -> LatchGuard {
        LatchGuard {
            latch: Arc::clone(self),
        }
    }

    pub fn count_down(&self) {
        let mut count = self.count_guard();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    #[cfg(test)]
    pub fn count(&self) -> usize {
        *self.count_guard()
    }

    /// Block until the count is zero.
    pub fn wait(&self) {
        let mut count = self.count_guard();
        while *count > 0 {
            count = self
                .zero
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Lowers its latch by one when dropped.
pub(crate) struct LatchGuard {
    latch: Arc<CountdownLatch>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
