use std::collections::VecDeque;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::Arc;
use std::thread;

use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex};

use crate::Result;

/// A deferred unit of work. The pool never inspects a job; it only runs it.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pending jobs plus the shutdown flag, guarded by one mutex.
///
/// The flag lives next to the queue because queue mutation and shutdown
/// signaling are coupled: a worker must never pop a job after shutdown
/// has flushed the queue.
struct QueueState {
    pending: VecDeque<Job>,
    shutdown: bool,
}

/// State shared between the pool handle and its workers.
///
/// Two independent locks: `queue` covers scheduling (enqueue/dequeue/
/// cancel), `outstanding` covers accounting (enqueue/completion). A
/// worker never holds both at once; jobs always run outside both.
struct Shared {
    queue: Mutex<QueueState>,
    job_available: Condvar,
    /// Jobs queued or currently executing. Invariant:
    /// `outstanding >= queue.pending.len()` at every observable instant.
    outstanding: Mutex<usize>,
    all_done: Condvar,
}

impl Shared {
    /// Marks `count` jobs as no longer outstanding (completed, cancelled,
    /// or discarded) and wakes `wait_all` callers if nothing remains.
    fn finalize(&self, count: usize) {
        let remaining = {
            let mut left = self.outstanding.lock();
            if *left < count {
                error!(
                    "outstanding count underflow: finalizing {} with {} outstanding",
                    count, *left
                );
                process::abort();
            }
            *left -= count;
            *left
        };

        if remaining == 0 {
            self.all_done.notify_all();
        }
    }
}

/// A fixed-size pool of worker threads pulling jobs from a shared FIFO queue.
///
/// Workers are spawned at construction and live until [`shutdown`] (or
/// drop). Pending jobs run in submission order; jobs a worker has already
/// claimed always run to completion. A job that panics is caught at the
/// worker boundary and logged, so one bad job never shrinks the pool.
///
/// [`shutdown`]: WorkerPool::shutdown
pub struct WorkerPool {
    shared: Arc<Shared>,
    /// Behind a mutex so `shutdown` can take `&self` and be called
    /// concurrently with the other operations.
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a pool with the given number of worker threads.
    ///
    /// A `workers` count of zero is accepted: the pool queues jobs but
    /// never executes them, so they stay pending until cancelled or the
    /// pool is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(workers: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                pending: VecDeque::new(),
                shutdown: false,
            }),
            job_available: Condvar::new(),
            outstanding: Mutex::new(0),
            all_done: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || worker_loop(id, &shared))?;
            handles.push(handle);
        }

        Ok(WorkerPool {
            shared,
            workers: Mutex::new(handles),
        })
    }

    /// Creates a pool with one worker per logical CPU.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn with_default_workers() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    /// Submits a job for execution by some worker.
    ///
    /// The outstanding count is incremented before the job becomes
    /// visible in the queue, so a worker that sees the job can never
    /// observe an under-count. Jobs enqueued after [`shutdown`] are
    /// discarded without running.
    ///
    /// [`shutdown`]: WorkerPool::shutdown
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut left = self.shared.outstanding.lock();
            *left += 1;
        }

        {
            let mut queue = self.shared.queue.lock();
            if queue.shutdown {
                drop(queue);
                warn!("enqueue on a shut-down pool; discarding job");
                self.shared.finalize(1);
                return;
            }
            queue.pending.push_back(Box::new(job));
        }

        self.shared.job_available.notify_one();
    }

    /// Cancels every job no worker has claimed yet.
    ///
    /// The pending queue is swapped out atomically; jobs already picked
    /// up by a worker are unaffected and run to completion. Each dropped
    /// job counts as finished, so a blocked [`wait_all`] caller is
    /// released if cancellation empties the pool.
    ///
    /// Returns the number of jobs dropped.
    ///
    /// [`wait_all`]: WorkerPool::wait_all
    pub fn cancel_pending(&self) -> usize {
        // Swap under the lock, destroy the jobs after releasing it.
        let dropped = {
            let mut queue = self.shared.queue.lock();
            mem::take(&mut queue.pending)
        };

        let count = dropped.len();
        if count > 0 {
            debug!("cancelled {count} pending jobs");
            self.shared.finalize(count);
        }
        count
    }

    /// Blocks until every outstanding job has completed or been cancelled.
    ///
    /// Returns immediately if nothing is outstanding. Any number of
    /// threads may wait concurrently; all are released when the count
    /// reaches zero.
    pub fn wait_all(&self) {
        let mut left = self.shared.outstanding.lock();
        while *left > 0 {
            self.shared.all_done.wait(&mut left);
        }
    }

    /// Stops the pool: discards still-pending jobs, wakes every worker,
    /// and joins them. Jobs currently executing run to completion.
    ///
    /// Discarded jobs go through the same accounting as
    /// [`cancel_pending`], so a concurrent [`wait_all`] caller is
    /// released rather than left hanging. Calling `shutdown` more than
    /// once is a no-op; dropping the pool invokes it implicitly.
    ///
    /// [`cancel_pending`]: WorkerPool::cancel_pending
    /// [`wait_all`]: WorkerPool::wait_all
    pub fn shutdown(&self) {
        let discarded = {
            let mut queue = self.shared.queue.lock();
            if queue.shutdown {
                return;
            }
            queue.shutdown = true;
            mem::take(&mut queue.pending)
        };

        if !discarded.is_empty() {
            debug!("discarding {} pending jobs at shutdown", discarded.len());
            self.shared.finalize(discarded.len());
        }

        self.shared.job_available.notify_all();

        let handles = mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked outside a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker loop: claim the head job, run it outside the locks, mark it
/// finished, repeat until shutdown.
fn worker_loop(id: usize, shared: &Shared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.shutdown {
                    debug!("worker {id}: shutting down");
                    return;
                }
                if let Some(job) = queue.pending.pop_front() {
                    break job;
                }
                shared.job_available.wait(&mut queue);
            }
        };

        debug!("worker {id}: executing job");
        // Catch panics so one failing job can't kill the worker or skip
        // the accounting below.
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("worker {id}: job panicked");
        }
        shared.finalize(1);
    }
}
