//! Aggregate many independently settling tasks into one result, optionally
//! bounded by a timeout.
//!
//! - [`combinator`]: wait for all, the first to settle, the first success,
//!   or every outcome.
//! - [`runner`]: the same strategies raced against a timer task, plus a
//!   [`Runner`](runner::Runner) that feeds them from a
//!   [`Source`](sources::Source).

pub mod combinator;
pub mod config;
pub mod consts;
pub mod error;
pub mod report;
pub mod runner;
pub mod sources;
pub mod task;

pub use error::{AggregateFailure, TaskFailure, TimeoutError};
pub use task::{Outcome, Task};
