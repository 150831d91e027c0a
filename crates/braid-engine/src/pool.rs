//! Fixed-size worker pool fed by a crossbeam channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use braid_core::{panic_message, WorkerId};
use crossbeam_channel::{Sender, SendError};

use crate::config::ConfigError;

/// A unit of work. Receives the ID of the thread that runs it.
pub(crate) type Job = Box<dyn FnOnce(WorkerId) + Send + 'static>;

/// Worker threads named `braid-worker-1` .. `braid-worker-N`, all
/// pulling from one unbounded job channel.
///
/// Dropping the pool closes the channel and joins every worker once
/// the queued jobs have run.
pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers.
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut pool = Self {
            sender: Some(sender),
            threads: Vec::with_capacity(size),
        };
        for n in 1..=size {
            let id = WorkerId(n as u32);
            let rx = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("braid-worker-{n}"))
                .spawn(move || {
                    for job in rx.iter() {
                        // Jobs catch their own panics; this keeps the
                        // worker alive if one slips through anyway.
                        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(id))) {
                            log::error!("{id}: job panicked: {}", panic_message(payload.as_ref()));
                        }
                    }
                })
                .map_err(|e| ConfigError::ThreadSpawnFailed {
                    reason: format!("braid-worker-{n}: {e}"),
                })?;
            pool.threads.push(handle);
        }
        log::debug!("worker pool started with {size} threads");
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Queue `job` for the next free worker.
    ///
    /// If the pool is shutting down the job runs inline on the caller
    /// under [`WorkerId::DRIVER`], so no submitted job is ever lost.
    pub fn execute(&self, job: Job) {
        let job = match &self.sender {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                Err(SendError(job)) => job,
            },
            None => job,
        };
        job(WorkerId::DRIVER);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}
