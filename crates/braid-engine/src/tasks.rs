//! Closures queued to run between ticks.

use std::panic::{catch_unwind, AssertUnwindSafe};

use braid_core::panic_message;
use braid_coupling::Workspace;
use crossbeam_channel::{Receiver, Sender};

/// A closure over the workspace, run while no tick is in progress.
pub(crate) type Task = Box<dyn FnOnce(&Workspace) + Send + 'static>;

/// Unbounded FIFO of [`Task`]s.
pub(crate) struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, task: Task) {
        // The queue owns both ends, so the channel cannot be disconnected.
        let _ = self.tx.send(task);
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Run every queued task in submission order. Returns how many ran.
    ///
    /// A panicking task is logged and skipped.
    pub fn drain(&self, workspace: &Workspace) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| task(workspace))) {
                log::warn!("queued task panicked: {}", panic_message(payload.as_ref()));
            }
            ran += 1;
        }
        ran
    }
}
