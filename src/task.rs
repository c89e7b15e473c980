//! Task polling utilities
//!
//! Provides helpers for polling async tasks spawned on the tokio runtime
//! without blocking the caller's render loop.

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};

/// Result of polling a task
pub enum PollResult<T> {
    /// No task to poll (task was None)
    NoTask,
    /// Task is still running
    Pending,
    /// Task completed with result (may be Ok or join error)
    Complete(Result<T, JoinError>),
}

/// Poll an optional task handle and return its result if finished.
///
/// # Returns
/// - `PollResult::NoTask` if task is None
/// - `PollResult::Pending` if task is still running
/// - `PollResult::Complete(result)` if task is finished
pub fn poll_task<T>(task: &mut Option<JoinHandle<T>>) -> PollResult<T> {
    let Some(handle) = task else {
        return PollResult::NoTask;
    };

    if !handle.is_finished() {
        return PollResult::Pending;
    }

    let Some(handle) = task.take() else {
        return PollResult::NoTask;
    };
    match handle.now_or_never() {
        Some(result) => PollResult::Complete(result),
        None => {
            // Shouldn't happen since we checked is_finished()
            tracing::warn!("Task not ready despite is_finished()");
            PollResult::Pending
        }
    }
}

/// Collect the results of every finished task, keeping the rest in place.
///
/// Results come back in spawn order.
pub fn drain_finished<T>(tasks: &mut Vec<Option<JoinHandle<T>>>) -> Vec<Result<T, JoinError>> {
    let mut finished = Vec::new();

    for slot in tasks.iter_mut() {
        if let PollResult::Complete(result) = poll_task(slot) {
            finished.push(result);
        }
    }

    tasks.retain(Option::is_some);
    finished
}
