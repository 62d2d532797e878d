//! Batch completion tracking.
//!
//! Every task belongs to exactly one batch. A batch counts its outstanding
//! tasks and its failures, so a waiter only ever blocks on the work it
//! submitted itself, never on an unrelated operation sharing the pool.

use core::marker::PhantomData;
use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::WorkerPool;
use crate::error::{MatrixError, Result};

/// A deferred, no-argument unit of work.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A job tagged with the batch that waits on it.
pub(crate) struct Task {
    job: Job,
    batch: Arc<BatchState>,
}

impl Task {
    pub(crate) fn new(job: Job, batch: Arc<BatchState>) -> Self {
        Self { job, batch }
    }

    /// Runs the job on worker `worker`, then signs it off its batch.
    ///
    /// The job (and everything it borrowed) is gone before the batch is told,
    /// which is what lets scoped tasks borrow from the waiting thread.
    pub(crate) fn run(self, worker: usize) {
        let Self { job, batch } = self;
        let ok = panic::catch_unwind(AssertUnwindSafe(job)).is_ok();
        if !ok {
            tracing::error!(worker, "task panicked; counted as failed");
        }
        batch.leave(ok);
    }
}

/// Outstanding and failed counts of one batch.
#[derive(Debug, Default)]
pub(crate) struct BatchState {
    pending: Mutex<usize>,
    drained: Condvar,
    submitted: AtomicUsize,
    failed: AtomicUsize,
}

impl BatchState {
    fn lock(&self) -> MutexGuard<'_, usize> {
        // tasks never run while the lock is held, so poisoning carries no
        // torn state
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a task before it becomes visible to workers.
    pub(crate) fn enter(&self) {
        *self.lock() += 1;
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Withdraws a task that never reached the queue.
    pub(crate) fn cancel(&self) {
        let _ = self
            .submitted
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.finish_one();
    }

    fn leave(&self, ok: bool) {
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.finish_one();
    }

    fn finish_one(&self) {
        let mut pending = self.lock();
        *pending -= 1;
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    /// Tasks registered and not yet finished.
    pub(crate) fn outstanding(&self) -> usize {
        *self.lock()
    }

    /// Blocks until no task is outstanding. Returns at once when idle.
    pub(crate) fn wait(&self) {
        let mut pending = self.lock();
        while *pending > 0 {
            pending = self
                .drained
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Reports failures since the previous call and starts a fresh tally.
    pub(crate) fn take_outcome(&self) -> Result<()> {
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let total = self.submitted.swap(0, Ordering::Relaxed);
        if failed == 0 {
            Ok(())
        } else {
            Err(MatrixError::TaskFailed { failed, total })
        }
    }
}

/// Completion handle for a group of `'static` tasks on a [`WorkerPool`].
///
/// Created by [`WorkerPool::batch`]. Dropping the handle does not cancel or
/// wait for its tasks.
pub struct Batch<'pool> {
    pool: &'pool WorkerPool,
    state: Arc<BatchState>,
}

impl<'pool> Batch<'pool> {
    pub(crate) fn new(pool: &'pool WorkerPool) -> Self {
        Self {
            pool,
            state: Arc::new(BatchState::default()),
        }
    }

    /// Queues `f` as part of this batch. Blocks while the queue is full.
    ///
    /// # Errors
    /// [`MatrixError::PoolStopped`] if the pool has been stopped.
    pub fn add_task<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.submit(Box::new(f), &self.state)
    }

    /// Number of tasks of this batch still queued or running.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.outstanding()
    }

    /// Blocks until every task of this batch has finished.
    ///
    /// # Errors
    /// [`MatrixError::TaskFailed`] if any of them panicked since the last wait.
    pub fn wait(&self) -> Result<()> {
        self.state.wait();
        self.state.take_outcome()
    }
}

/// A batch whose tasks may borrow from the stack of the thread that opened it.
///
/// Created by [`WorkerPool::scope`], which does not return until every task
/// spawned here has finished.
pub struct Scope<'scope, 'env: 'scope> {
    pool: &'scope WorkerPool,
    state: Arc<BatchState>,
    scope: PhantomData<&'scope mut &'scope ()>,
    env: PhantomData<&'env mut &'env ()>,
}

impl<'scope> Scope<'scope, '_> {
    /// Queues `f` as part of this scope. Blocks while the queue is full.
    ///
    /// # Errors
    /// [`MatrixError::PoolStopped`] if the pool has been stopped; `f` is
    /// dropped without running.
    pub fn spawn<F>(&'scope self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'scope,
    {
        let job: Box<dyn FnOnce() + Send + 'scope> = Box::new(f);
        // SAFETY: `WorkerPool::scope` blocks on this batch before `'scope`
        // ends, even while unwinding, and `Task::run` drops the job before
        // signing it off, so the job never outlives the borrows it captured.
        #[allow(unsafe_code)]
        let job: Job = unsafe { mem::transmute::<Box<dyn FnOnce() + Send + 'scope>, Job>(job) };
        self.pool.submit(job, &self.state)
    }

    /// Number of tasks of this scope still queued or running.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.outstanding()
    }
}

/// Waits for a batch when dropped, including during a panic.
struct WaitGuard<'a>(&'a BatchState);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}

impl WorkerPool {
    /// Opens an isolated batch of `'static` tasks.
    #[must_use]
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    /// Runs `f` with a [`Scope`] for spawning tasks that borrow local data,
    /// then waits for all of them.
    ///
    /// Tasks must not themselves open scopes or wait on this pool: with every
    /// worker blocked the queue never drains.
    ///
    /// # Errors
    /// [`MatrixError::TaskFailed`] if any spawned task panicked. The value
    /// returned by `f` is discarded in that case.
    ///
    /// # Example
    /// ```
    /// use briny_matrix::WorkerPool;
    ///
    /// let pool = WorkerPool::new(2, 4).unwrap();
    /// let mut halves = [0u64; 2];
    /// let (lo, hi) = halves.split_at_mut(1);
    /// pool.scope(|s| {
    ///     s.spawn(|| lo[0] = (0..50).sum()).unwrap();
    ///     s.spawn(|| hi[0] = (50..100).sum()).unwrap();
    /// })
    /// .unwrap();
    /// assert_eq!(halves[0] + halves[1], 4950);
    /// ```
    pub fn scope<'env, F, T>(&self, f: F) -> Result<T>
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> T,
    {
        let scope = Scope {
            pool: self,
            state: Arc::new(BatchState::default()),
            scope: PhantomData,
            env: PhantomData,
        };
        let value = {
            let _guard = WaitGuard(&scope.state);
            f(&scope)
        };
        scope.state.take_outcome()?;
        Ok(value)
    }
}
