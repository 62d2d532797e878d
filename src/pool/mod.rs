//! # Worker Pool
//!
//! A fixed set of long-lived worker threads consuming tasks from one bounded
//! queue.
//!
//! ## Surfaces
//!
//! - [`WorkerPool::add_task`] / [`WorkerPool::wait_all`]: fire tasks into the
//!   pool's shared batch and wait for it to drain. Every caller of these two
//!   shares one counter, so they suit a single producer at a time.
//! - [`WorkerPool::batch`]: an isolated [`Batch`] with its own counter.
//! - [`WorkerPool::scope`]: an isolated [`Scope`] whose tasks may borrow
//!   local data; this is what the [`Engine`](crate::Engine) uses.
//!
//! ## Guarantees
//!
//! - A task is counted before it is enqueued, so a wait can never observe an
//!   empty batch while its producer is still submitting.
//! - The queue holds `queue_capacity` tasks; submitting to a full queue blocks.
//! - A panicking task is caught on the worker, counted against its batch and
//!   reported as [`MatrixError::TaskFailed`]; the worker keeps serving.
//! - The worker count never changes after construction.

mod batch;
mod worker;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

pub use self::batch::{Batch, Scope};
use self::batch::{BatchState, Job, Task};
use self::worker::StateCell;
pub use self::worker::WorkerState;
use crate::error::{MatrixError, Result};

/// Fixed-size pool of worker threads.
///
/// Dropping the pool stops it.
pub struct WorkerPool {
    sender: RwLock<Option<Sender<Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    states: Vec<Arc<StateCell>>,
    queue_capacity: usize,
    shared: Arc<BatchState>,
    submitted: AtomicUsize,
}

impl WorkerPool {
    /// Spawns `workers` threads sharing a queue of `queue_capacity` slots.
    ///
    /// # Errors
    /// - [`MatrixError::InvalidConfig`] if either count is zero.
    /// - [`MatrixError::Spawn`] if a thread cannot be started; workers that
    ///   did start are shut down again.
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        if workers == 0 {
            return Err(MatrixError::InvalidConfig("workers must be at least 1".into()));
        }
        if queue_capacity == 0 {
            return Err(MatrixError::InvalidConfig(
                "queue_capacity must be at least 1".into(),
            ));
        }

        let (sender, receiver) = crossbeam_channel::bounded(queue_capacity);
        let mut pool = Self {
            sender: RwLock::new(Some(sender)),
            handles: Mutex::new(Vec::with_capacity(workers)),
            states: Vec::with_capacity(workers),
            queue_capacity,
            shared: Arc::new(BatchState::default()),
            submitted: AtomicUsize::new(0),
        };

        for id in 0..workers {
            // on error `pool` drops here, closing the queue and joining the
            // workers spawned so far
            let (state, handle) = worker::spawn(id, receiver.clone())?;
            pool.states.push(state);
            pool.handles
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
        }
        tracing::debug!(workers, queue_capacity, "worker pool started");
        Ok(pool)
    }

    /// Number of workers, fixed at construction.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.states.len()
    }

    /// Queue slots, fixed at construction.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Total tasks accepted since construction, across all batches.
    #[must_use]
    pub fn tasks_submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Current state of every worker, indexed by worker id.
    #[must_use]
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.states.iter().map(|s| s.get()).collect()
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub(crate) fn submit(&self, job: Job, batch: &Arc<BatchState>) -> Result<()> {
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(MatrixError::PoolStopped);
        };
        batch.enter();
        if let Err(err) = sender.send(Task::new(job, Arc::clone(batch))) {
            // release whatever the job borrowed before the batch can drain
            drop(err.into_inner());
            batch.cancel();
            return Err(MatrixError::PoolStopped);
        }
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Queues `f` on the pool's shared batch without waiting for it to run.
    ///
    /// Blocks while the queue is full.
    ///
    /// # Errors
    /// [`MatrixError::PoolStopped`] if the pool has been stopped.
    pub fn add_task<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f), &self.shared)
    }

    /// Blocks until the shared batch has no outstanding tasks. Returns at once
    /// if nothing was added.
    ///
    /// # Errors
    /// [`MatrixError::TaskFailed`] if a shared task panicked since the last
    /// call.
    pub fn wait_all(&self) -> Result<()> {
        self.shared.wait();
        self.shared.take_outcome()
    }

    /// Closes the queue and joins every worker.
    ///
    /// Workers finish the task in hand and whatever is still queued, then
    /// exit. Later submissions fail with [`MatrixError::PoolStopped`].
    /// Calling `stop` again is a no-op. Concurrent callers all block until
    /// every worker has been joined. Must not be called from a task.
    pub fn stop(&self) {
        // held through the joins so a second caller waits for the first
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = self
            .sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        for handle in handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread terminated abnormally");
            }
        }
        tracing::debug!(workers = self.worker_count(), "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.worker_count())
            .field("queue_capacity", &self.queue_capacity)
            .field("tasks_submitted", &self.tasks_submitted())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(WorkerPool::new(0, 4), Err(MatrixError::InvalidConfig(_))));
        assert!(matches!(WorkerPool::new(2, 0), Err(MatrixError::InvalidConfig(_))));
    }

    #[test]
    fn wait_all_without_tasks_returns_immediately() {
        let pool = WorkerPool::new(2, 4).unwrap();
        assert!(pool.wait_all().is_ok());
        assert!(pool.wait_all().is_ok());
        assert_eq!(pool.tasks_submitted(), 0);
    }

    #[test]
    fn add_task_runs_everything_before_wait_all_returns() {
        let pool = WorkerPool::new(3, 2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.add_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.wait_all().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(pool.tasks_submitted(), 50);
    }

    #[test]
    fn workers_go_idle_then_stopped() {
        let pool = WorkerPool::new(2, 2).unwrap();
        wait_until(|| pool.worker_states().iter().all(|s| *s == WorkerState::Idle));
        pool.stop();
        assert!(pool.is_stopped());
        assert!(pool.worker_states().iter().all(|s| *s == WorkerState::Stopped));
    }

    #[test]
    fn running_state_is_visible() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        pool.add_task(move || {
            let _ = release_rx.recv();
        })
        .unwrap();
        wait_until(|| pool.worker_states()[0] == WorkerState::Running);
        release_tx.send(()).unwrap();
        pool.wait_all().unwrap();
        wait_until(|| pool.worker_states()[0] == WorkerState::Idle);
    }

    #[test]
    fn stop_drains_queued_tasks_then_rejects() {
        let pool = WorkerPool::new(1, 8).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.add_task(move || {
                std::thread::sleep(Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(pool.add_task(|| {}), Err(MatrixError::PoolStopped));
        pool.stop();
    }

    #[test]
    fn concurrent_stop_waits_for_workers() {
        let pool = Arc::new(WorkerPool::new(1, 1).unwrap());
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        pool.add_task(move || {
            let _ = release_rx.recv();
        })
        .unwrap();
        wait_until(|| pool.worker_states()[0] == WorkerState::Running);

        let first = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.stop())
        };
        wait_until(|| pool.is_stopped());
        let second = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                pool.stop();
                pool.worker_states()
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());
        assert_eq!(pool.worker_states(), vec![WorkerState::Running]);

        release_tx.send(()).unwrap();
        first.join().unwrap();
        assert_eq!(second.join().unwrap(), vec![WorkerState::Stopped]);
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::new(1, 2).unwrap();
        pool.add_task(|| panic!("task failure")).unwrap();
        assert_eq!(
            pool.wait_all(),
            Err(MatrixError::TaskFailed {
                failed: 1,
                total: 1
            })
        );

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran);
        pool.add_task(move || {
            flag.store(1, Ordering::SeqCst);
        })
        .unwrap();
        pool.wait_all().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batches_are_isolated() {
        let pool = WorkerPool::new(2, 4).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        let slow = pool.batch();
        slow.add_task(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

        let fast = pool.batch();
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        fast.add_task(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        // the fast batch drains while the slow one is still blocked
        fast.wait().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(slow.outstanding(), 1);

        release_tx.send(()).unwrap();
        slow.wait().unwrap();
        assert_eq!(slow.outstanding(), 0);
    }

    #[test]
    fn scope_waits_for_borrowed_tasks() {
        let pool = WorkerPool::new(4, 8).unwrap();
        let mut data = vec![0usize; 64];
        pool.scope(|s| {
            for (i, chunk) in data.chunks_mut(16).enumerate() {
                s.spawn(move || {
                    for x in chunk.iter_mut() {
                        *x = i + 1;
                    }
                })
                .unwrap();
            }
        })
        .unwrap();
        assert_eq!(data.iter().sum::<usize>(), 16 * (1 + 2 + 3 + 4));
    }

    #[test]
    fn scope_reports_failed_task() {
        let pool = WorkerPool::new(2, 4).unwrap();
        let result = pool.scope(|s| {
            s.spawn(|| {}).unwrap();
            s.spawn(|| panic!("chunk failed")).unwrap();
            7
        });
        assert_eq!(
            result,
            Err(MatrixError::TaskFailed {
                failed: 1,
                total: 2
            })
        );
        // the pool still serves scopes afterwards
        assert_eq!(pool.scope(|_| 3), Ok(3));
    }

    #[test]
    fn scope_on_stopped_pool_fails_to_spawn() {
        let pool = WorkerPool::new(1, 1).unwrap();
        pool.stop();
        let outcome = pool.scope(|s| s.spawn(|| {}));
        assert_eq!(outcome, Ok(Err(MatrixError::PoolStopped)));
    }
}
