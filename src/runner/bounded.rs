//! Combinators raced against a timer task.
//!
//! Each function arms its timer when it is called, not when the returned
//! future is first polled. The timer is aborted as soon as the returned
//! future completes or is dropped. Tasks still running when the timer wins
//! are left alone; callers that want them stopped abort them through
//! [`Task::abort_handle`].

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::warn;

use crate::combinator::{wait_all, wait_all_settled, wait_first_settled, wait_first_success};
use crate::error::{TaskFailure, TimeoutError};
use crate::task::{Outcome, Task};

/// A task that rejects with [`TaskFailure::TimedOut`] once `after` elapses.
pub fn timeout_task<T: Send + 'static>(after: Duration) -> Task<T> {
    Task::settle_with(async move {
        tokio::time::sleep(after).await;
        Err(TimeoutError::new(after).into())
    })
}

/// Aborts the timer it holds when dropped.
struct Disarm(Option<AbortHandle>);

impl Drop for Disarm {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

fn arm<T: Send + 'static>(after: Duration) -> (Task<T>, Disarm) {
    let timer = timeout_task(after);
    let disarm = Disarm(timer.abort_handle());
    (timer, disarm)
}

/// First settlement among `tasks`, unless `after` elapses first.
pub fn race_with_timeout<T: Send + 'static>(
    mut tasks: Vec<Task<T>>,
    after: Duration,
) -> impl Future<Output = Result<T, TaskFailure>> {
    let started = Instant::now();
    let (timer, disarm) = arm(after);
    tasks.push(timer);
    async move {
        let _disarm = disarm;
        let result = wait_first_settled(tasks).await;
        if let Err(TaskFailure::TimedOut(_)) = &result {
            warn!(elapsed_ms = started.elapsed().as_millis() as u64, "race timed out");
        }
        result
    }
}

/// Every task's outcome in input order, or [`TimeoutError`] when they have
/// not all settled within `after`. Outcomes already known at that point are
/// discarded.
pub fn all_settled_with_timeout<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    after: Duration,
) -> impl Future<Output = Result<Vec<Outcome<T>>, TimeoutError>> {
    let settled = Task::deferred(async move { Ok(wait_all_settled(tasks).await) });
    let (timer, disarm) = arm(after);
    async move {
        let _disarm = disarm;
        settled_or_timeout(wait_first_settled(vec![settled, timer]).await, after)
    }
}

// The aggregation itself never rejects, so anything but the timer firing
// means the timer task died some other way. Report it as the timeout.
fn settled_or_timeout<T>(
    result: Result<Vec<Outcome<T>>, TaskFailure>,
    after: Duration,
) -> Result<Vec<Outcome<T>>, TimeoutError> {
    match result {
        Ok(outcomes) => Ok(outcomes),
        Err(TaskFailure::TimedOut(err)) => {
            warn!(after_ms = err.after_ms, "all-settled timed out");
            Err(err)
        }
        Err(other) => {
            warn!(%other, "all-settled timer failed");
            Err(TimeoutError::new(after))
        }
    }
}

/// Values of every task in input order, the first rejection, or a timeout.
pub fn all_with_timeout<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    after: Duration,
) -> impl Future<Output = Result<Vec<T>, TaskFailure>> {
    let all = Task::deferred(wait_all(tasks));
    let (timer, disarm) = arm(after);
    async move {
        let _disarm = disarm;
        wait_first_settled(vec![all, timer]).await
    }
}

/// First fulfilled value, or a timeout. When every task rejects in time the
/// failure is [`TaskFailure::Aggregate`] holding each reason in input order.
pub fn first_success_with_timeout<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    after: Duration,
) -> impl Future<Output = Result<T, TaskFailure>> {
    let any = Task::deferred(async move {
        wait_first_success(tasks)
            .await
            .map_err(TaskFailure::from)
    });
    let (timer, disarm) = arm(after);
    async move {
        let _disarm = disarm;
        wait_first_settled(vec![any, timer]).await
    }
}
