//! Task handles and their settled outcomes.
//!
//! A [`Task`] is started the moment it is created: [`Task::spawn`] hands the
//! future to the tokio runtime right away, so every task in a batch runs
//! concurrently before any combinator looks at it. Dropping a task detaches
//! it; it keeps running and its result is discarded.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::task::{AbortHandle, JoinError, JoinHandle};

use crate::error::TaskFailure;

/// How a task settled. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Outcome<T> {
    Fulfilled(T),
    Rejected(TaskFailure),
}

impl<T> Outcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl<T> From<Result<T, TaskFailure>> for Outcome<T> {
    fn from(result: Result<T, TaskFailure>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, TaskFailure> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(reason),
        }
    }
}

enum Inner<T> {
    Spawned(JoinHandle<Result<T, TaskFailure>>),
    Ready(future::Ready<Result<T, TaskFailure>>),
    Deferred(BoxFuture<'static, Result<T, TaskFailure>>),
}

/// A single unit of work that settles exactly once.
pub struct Task<T> {
    inner: Inner<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Spawn `fut` on the current tokio runtime. Its error becomes
    /// [`TaskFailure::Rejected`] carrying the alternate display of the error,
    /// so an `anyhow` chain keeps its context.
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        Self::settle_with(async move {
            fut.await
                .map_err(|e| TaskFailure::Rejected(format!("{e:#}")))
        })
    }

    /// Spawn a future that already reports a [`TaskFailure`].
    pub fn settle_with<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, TaskFailure>> + Send + 'static,
    {
        Self {
            inner: Inner::Spawned(tokio::spawn(fut)),
        }
    }

    /// Wrap a future without spawning it. It makes progress only while a
    /// combinator polls it.
    pub(crate) fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, TaskFailure>> + Send + 'static,
    {
        Self {
            inner: Inner::Deferred(fut.boxed()),
        }
    }
}

impl<T> Task<T> {
    /// A task that has already settled.
    pub fn ready(result: Result<T, TaskFailure>) -> Self {
        Self {
            inner: Inner::Ready(future::ready(result)),
        }
    }

    pub fn fulfilled(value: T) -> Self {
        Self::ready(Ok(value))
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::ready(Err(TaskFailure::Rejected(reason.into())))
    }

    /// Handle for cancelling a spawned task. Aborting settles it as
    /// [`TaskFailure::Aborted`]; tasks that are not spawned have none.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        match &self.inner {
            Inner::Spawned(handle) => Some(handle.abort_handle()),
            Inner::Ready(_) | Inner::Deferred(_) => None,
        }
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, TaskFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Inner::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(err) => Err(join_failure(err)),
            }),
            Inner::Ready(ready) => Pin::new(ready).poll(cx),
            Inner::Deferred(fut) => fut.as_mut().poll(cx),
        }
    }
}

fn join_failure(err: JoinError) -> TaskFailure {
    if err.is_cancelled() {
        return TaskFailure::Aborted;
    }
    match err.try_into_panic() {
        Ok(payload) => TaskFailure::Panicked(panic_message(payload)),
        Err(err) => TaskFailure::Panicked(err.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
