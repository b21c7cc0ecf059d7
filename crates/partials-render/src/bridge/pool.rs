//! Fixed-size worker thread pool.
//!
//! Jobs go through an unbounded MPMC channel, so any number of threads can
//! submit concurrently while at most `size` jobs run at once. Shutting down
//! closes the channel: queued jobs still run, then workers exit and are
//! joined.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::RenderError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of render worker threads.
pub struct RenderPool {
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RenderPool {
    /// Starts `size` worker threads.
    ///
    /// # Errors
    ///
    /// [`RenderError::Worker`] if `size` is zero or a thread cannot be spawned.
    pub fn new(size: usize) -> Result<Self, RenderError> {
        if size == 0 {
            return Err(RenderError::Worker(
                "pool needs at least one worker".to_string(),
            ));
        }

        let (sender, receiver) = channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("partials-worker-{}", index))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!(worker = index, "partial render panicked");
                        }
                    }
                })
                .map_err(|e| RenderError::Worker(format!("failed to spawn worker: {}", e)));

            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Close the channel so already spawned workers exit.
                    drop(sender);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(err);
                }
            }
        }

        debug!(workers = size, "started partial render pool");
        Ok(Self {
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues a job.
    ///
    /// # Errors
    ///
    /// [`RenderError::Worker`] if the pool has been shut down.
    pub fn execute<F>(&self, job: F) -> Result<(), RenderError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| RenderError::Worker("render pool is shut down".to_string()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| RenderError::Worker("render pool is shut down".to_string()))
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers.
    ///
    /// Calling this more than once is a no-op. A worker that ends up running
    /// the shutdown (by dropping the last owner of the pool) is not joined.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("partial render worker exited with a panic");
            }
        }
        debug!(workers = self.size, "stopped partial render pool");
    }
}

impl Drop for RenderPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for RenderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPool")
            .field("size", &self.size)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
