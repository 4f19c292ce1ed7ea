pub mod bounded;

pub use bounded::{
    all_settled_with_timeout, all_with_timeout, first_success_with_timeout, race_with_timeout,
    timeout_task,
};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::info;

use crate::consts::DEFAULT_TIMEOUT_MS;
use crate::report::{Report, ReportResult};
use crate::sources::{Source, tasks_for};

/// Which combinator decides the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Every target must answer.
    All,
    /// Whatever settles first, answer or error.
    Race,
    /// First answer, ignoring errors.
    Any,
    /// Every target's outcome, answer or error.
    AllSettled,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Race => "race",
            Self::Any => "any",
            Self::AllSettled => "all-settled",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "race" => Ok(Self::Race),
            "any" => Ok(Self::Any),
            "all-settled" | "all_settled" | "allsettled" => Ok(Self::AllSettled),
            other => bail!("unknown strategy: {} (expected all, race, any, all-settled)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub strategy: Strategy,
    pub timeout: Duration,
    /// Abort targets still in flight once the run is decided. Off by
    /// default: losers run to completion and are ignored.
    pub abort_losers: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Race,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            abort_losers: false,
        }
    }
}

/// Queries every target through a [`Source`] and decides the run with the
/// configured strategy, bounded by the configured timeout.
pub struct Runner {
    source: Arc<dyn Source>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(source: Arc<dyn Source>, config: RunnerConfig) -> Self {
        Self { source, config }
    }

    /// Failures end up in the report, not in an `Err`.
    pub async fn run(&self, targets: &[String]) -> Report {
        let RunnerConfig {
            strategy,
            timeout,
            abort_losers,
        } = self.config;

        info!(
            source = self.source.name(),
            %strategy,
            targets = targets.len(),
            timeout_ms = timeout.as_millis() as u64,
            "starting run"
        );

        let started = Instant::now();
        let tasks = tasks_for(&self.source, targets);
        let in_flight: Vec<AbortHandle> = tasks.iter().filter_map(|t| t.abort_handle()).collect();

        let result = match strategy {
            Strategy::All => match all_with_timeout(tasks, timeout).await {
                Ok(values) => ReportResult::Values { values },
                Err(reason) => ReportResult::from_failure(reason),
            },
            Strategy::Race => match race_with_timeout(tasks, timeout).await {
                Ok(value) => ReportResult::Value { value },
                Err(reason) => ReportResult::from_failure(reason),
            },
            Strategy::Any => match first_success_with_timeout(tasks, timeout).await {
                Ok(value) => ReportResult::Value { value },
                Err(reason) => ReportResult::from_failure(reason),
            },
            Strategy::AllSettled => match all_settled_with_timeout(tasks, timeout).await {
                Ok(outcomes) => ReportResult::Settled { outcomes },
                Err(error) => ReportResult::TimedOut { error },
            },
        };

        if abort_losers {
            let still_running = in_flight.iter().filter(|h| !h.is_finished()).count();
            for handle in &in_flight {
                handle.abort();
            }
            info!(aborted = still_running, "aborted losing targets");
        }

        let report = Report {
            strategy,
            timeout_ms: timeout.as_millis() as u64,
            elapsed_ms: started.elapsed().as_millis() as u64,
            result,
        };
        info!(
            elapsed_ms = report.elapsed_ms,
            succeeded = report.succeeded(),
            "run finished"
        );
        report
    }
}
