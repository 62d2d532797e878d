//! Worker threads and their state machine.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use super::batch::Task;
use crate::error::{MatrixError, Result};

/// Observable state of one worker.
///
/// `Idle -> Running` on dequeuing a task, `Running -> Idle` when it returns,
/// `Idle -> Stopped` once the queue is closed and drained. A task is never
/// abandoned half-way: stopping only takes effect between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting on the queue.
    Idle = 0,
    /// Executing a task.
    Running,
    /// Exited; the thread has finished or is about to.
    Stopped,
}

impl TryFrom<u8> for WorkerState {
    type Error = ();

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Running),
            2 => Ok(Self::Stopped),
            _ => Err(()),
        }
    }
}

/// Shared cell through which a worker publishes its [`WorkerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::try_from(self.0.load(Ordering::Acquire)).unwrap_or(WorkerState::Stopped)
    }
}

/// Spawns worker `id` on its own named thread.
pub(crate) fn spawn(
    id: usize,
    receiver: Receiver<Task>,
) -> Result<(Arc<StateCell>, JoinHandle<()>)> {
    let state = Arc::new(StateCell::new());
    let cell = Arc::clone(&state);
    let handle = thread::Builder::new()
        .name(format!("briny-worker-{id}"))
        .spawn(move || worker_loop(id, &receiver, &cell))
        .map_err(|err| MatrixError::Spawn(err.to_string()))?;
    Ok((state, handle))
}

fn worker_loop(id: usize, receiver: &Receiver<Task>, state: &StateCell) {
    tracing::debug!(worker = id, "worker started");
    // recv keeps yielding queued tasks after the last sender is gone and only
    // errors once the queue is both closed and empty
    while let Ok(task) = receiver.recv() {
        state.set(WorkerState::Running);
        task.run(id);
        state.set(WorkerState::Idle);
    }
    state.set(WorkerState::Stopped);
    tracing::debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_u8() {
        for s in [WorkerState::Idle, WorkerState::Running, WorkerState::Stopped] {
            assert_eq!(WorkerState::try_from(s as u8), Ok(s));
        }
        assert!(WorkerState::try_from(9).is_err());
    }

    #[test]
    fn worker_exits_when_queue_closes() {
        let (tx, rx) = crossbeam_channel::bounded::<Task>(1);
        let (state, handle) = spawn(0, rx).unwrap();
        drop(tx);
        handle.join().unwrap();
        assert_eq!(state.get(), WorkerState::Stopped);
    }
}
