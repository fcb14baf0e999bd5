#![deny(missing_docs)]

//! A fixed-size worker thread pool with bulk cancellation and blocking drain.
//!
//! [`WorkerPool`] owns a fixed set of worker threads that pull jobs from a
//! shared FIFO queue. Producers submit jobs with [`WorkerPool::enqueue`],
//! drop every job that no worker has claimed yet with
//! [`WorkerPool::cancel_pending`], and block until all outstanding work has
//! finished with [`WorkerPool::wait_all`]. Dropping the pool (or calling
//! [`WorkerPool::shutdown`]) discards any still-pending jobs and joins every
//! worker.

mod error;
mod pool;

pub use error::{PoolError, Result};
pub use pool::WorkerPool;
