//! Aggregation strategies over a batch of [`Task`]s.
//!
//! Every combinator takes ownership of its tasks, so a settled task cannot be
//! fed to a second combinator. Settlements are tagged with the task's input
//! position before they are looked at; completion order only decides who
//! wins a race, never where a result lands.

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use tracing::debug;

use crate::error::{AggregateFailure, TaskFailure};
use crate::task::{Outcome, Task};

/// Yields `(input index, result)` as each task settles.
fn settlements<T>(
    tasks: Vec<Task<T>>,
) -> impl Stream<Item = (usize, Result<T, TaskFailure>)> + Unpin {
    tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) })
        .collect::<FuturesUnordered<_>>()
}

fn empty_slots<V>(len: usize) -> Vec<Option<V>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

/// Values of every task in input order, or the first rejection seen.
///
/// Returns as soon as any task rejects. The other tasks keep running and
/// their results are ignored.
pub async fn wait_all<T>(tasks: Vec<Task<T>>) -> Result<Vec<T>, TaskFailure> {
    let total = tasks.len();
    let mut values = empty_slots(total);
    let mut pending = settlements(tasks);

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => {
                debug_assert!(values[index].is_none(), "task {index} settled twice");
                values[index] = Some(value);
            }
            Err(reason) => {
                debug!(index, total, %reason, "wait_all: rejected");
                return Err(reason);
            }
        }
    }

    debug!(total, "wait_all: all fulfilled");
    Ok(values.into_iter().flatten().collect())
}

/// Result of whichever task settles first, fulfilled or not.
///
/// An empty batch fails with [`TaskFailure::NoTasks`] instead of waiting
/// forever.
pub async fn wait_first_settled<T>(tasks: Vec<Task<T>>) -> Result<T, TaskFailure> {
    let total = tasks.len();
    match settlements(tasks).next().await {
        Some((index, result)) => {
            debug!(index, total, fulfilled = result.is_ok(), "wait_first_settled: settled");
            result
        }
        None => Err(TaskFailure::NoTasks),
    }
}

/// Value of the first task to fulfill. Faster rejections are skipped.
///
/// When every task rejects, the failure carries one reason per task in input
/// order. An empty batch fails immediately with no reasons.
pub async fn wait_first_success<T>(tasks: Vec<Task<T>>) -> Result<T, AggregateFailure> {
    let total = tasks.len();
    let mut reasons = empty_slots(total);
    let mut pending = settlements(tasks);

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => {
                debug!(index, total, "wait_first_success: fulfilled");
                return Ok(value);
            }
            Err(reason) => {
                debug!(index, %reason, "wait_first_success: skipping rejection");
                reasons[index] = Some(reason);
            }
        }
    }

    debug!(total, "wait_first_success: all rejected");
    Err(AggregateFailure::new(reasons.into_iter().flatten().collect()))
}

/// One outcome per task, in input order, once every task has settled.
/// Never fails.
pub async fn wait_all_settled<T>(tasks: Vec<Task<T>>) -> Vec<Outcome<T>> {
    let total = tasks.len();
    let mut outcomes = empty_slots(total);
    let mut pending = settlements(tasks);

    while let Some((index, result)) = pending.next().await {
        debug_assert!(outcomes[index].is_none(), "task {index} settled twice");
        outcomes[index] = Some(Outcome::from(result));
    }

    debug!(total, "wait_all_settled: all settled");
    outcomes.into_iter().flatten().collect()
}
