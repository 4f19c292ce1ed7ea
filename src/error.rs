//! Failure types shared by the combinators and the bounded runner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raised by the runner's timer task when the bounded wait elapses first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("timeout: no task settled within {after_ms}ms")]
pub struct TimeoutError {
    pub after_ms: u64,
}

impl TimeoutError {
    pub fn new(after: Duration) -> Self {
        Self {
            after_ms: after.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }
}

/// Why a single task did not fulfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskFailure {
    /// The task's own future returned an error.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    TimedOut(#[from] TimeoutError),
    /// Every task in a first-success wait rejected.
    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task was aborted")]
    Aborted,
    /// Nothing was handed to a combinator that needs at least one task.
    #[error("no tasks to wait on")]
    NoTasks,
}

impl TaskFailure {
    /// True when the bounded wait elapsed, as opposed to a task failing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Every task rejected. Reasons are kept in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", list_reasons(.reasons))]
pub struct AggregateFailure {
    pub reasons: Vec<TaskFailure>,
}

impl AggregateFailure {
    pub fn new(reasons: Vec<TaskFailure>) -> Self {
        Self { reasons }
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

fn list_reasons(reasons: &[TaskFailure]) -> String {
    if reasons.is_empty() {
        return "all tasks rejected (no tasks given)".to_string();
    }
    let mut out = format!("all {} tasks rejected", reasons.len());
    for (i, reason) in reasons.iter().enumerate() {
        out.push_str(&format!("\n  [{}] {}", i, reason));
    }
    out
}
