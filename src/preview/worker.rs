//! Background worker pool for blocking decoder calls
//!
//! Stills, single video frames and source opening run here so the control
//! thread never blocks on the decoder. Each job reports its own outcome,
//! usually by posting a command back to the scheduler.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::trace;

/// Default number of worker threads in the pool
pub const DEFAULT_POOL_SIZE: usize = 2;

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of threads draining a shared job channel.
///
/// Workers exit once the pool is dropped and the queued jobs are drained.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> Self {
        let (job_tx, job_rx) = channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..num_threads.max(1))
            .map(|index| spawn_worker(index, Arc::clone(&job_rx)))
            .collect();

        Self {
            job_tx: Some(job_tx),
            workers,
        }
    }

    /// Queue a job (non-blocking).
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.job_tx {
            // Ignore send errors (all workers may have exited)
            let _ = tx.send(Box::new(job));
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets every worker fall out of its loop
        drop(self.job_tx.take());
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // A job that drops the pool from inside a worker must not join itself
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
    }
}

fn spawn_worker(index: usize, job_rx: Arc<Mutex<Receiver<Job>>>) -> JoinHandle<()> {
    trace!(worker = index, "Spawning preview worker");
    thread::spawn(move || loop {
        let job = {
            let rx = job_rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match rx.recv() {
                Ok(job) => job,
                Err(_) => return, // channel closed
            }
        };
        job();
    })
}
