//! Run reports and their terminal rendering.

use serde::{Deserialize, Serialize};

use crate::consts::format_number;
use crate::error::{TaskFailure, TimeoutError};
use crate::runner::Strategy;
use crate::task::Outcome;

/// What a run produced. A timeout is its own variant so it never reads as
/// an ordinary failure or an empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportResult {
    /// One body (race, any).
    Value { value: String },
    /// Every body in target order (all).
    Values { values: Vec<String> },
    /// Every outcome in target order (all-settled).
    Settled { outcomes: Vec<Outcome<String>> },
    Failed { reason: TaskFailure },
    TimedOut { error: TimeoutError },
}

impl ReportResult {
    /// Lift a timeout out of a [`TaskFailure`] into its own variant.
    pub fn from_failure(reason: TaskFailure) -> Self {
        match reason {
            TaskFailure::TimedOut(error) => Self::TimedOut { error },
            reason => Self::Failed { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub strategy: Strategy,
    pub timeout_ms: u64,
    pub elapsed_ms: u64,
    pub result: ReportResult,
}

impl Report {
    /// False only when the run failed or timed out. A settled report counts
    /// as a success even if some targets rejected.
    pub fn succeeded(&self) -> bool {
        !matches!(
            self.result,
            ReportResult::Failed { .. } | ReportResult::TimedOut { .. }
        )
    }
}

/// Render a report as plain lines for the terminal.
pub fn render(report: &Report, targets: &[String]) -> String {
    let mut out = String::new();
    match &report.result {
        ReportResult::Value { value } => {
            out.push_str(&format!("=> {}\n", value.trim_end()));
        }
        ReportResult::Values { values } => {
            for (target, value) in targets.iter().zip(values) {
                out.push_str(&format!("  [{}] ✓ {}\n", target, value.trim_end()));
            }
        }
        ReportResult::Settled { outcomes } => {
            for (target, outcome) in targets.iter().zip(outcomes) {
                match outcome {
                    Outcome::Fulfilled(value) => {
                        out.push_str(&format!("  [{}] ✓ {}\n", target, value.trim_end()));
                    }
                    Outcome::Rejected(reason) => {
                        out.push_str(&format!("  [{}] ✗ {}\n", target, reason));
                    }
                }
            }
        }
        ReportResult::Failed { reason } => {
            out.push_str(&format!("error: {}\n", reason));
        }
        ReportResult::TimedOut { error } => {
            out.push_str(&format!("error: {}\n", error));
        }
    }
    out.push_str(&format!(
        "{} in {} ms (limit {} ms)\n",
        report.strategy,
        format_number(report.elapsed_ms),
        format_number(report.timeout_ms),
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregateFailure;
    use std::time::Duration;

    fn report(result: ReportResult) -> Report {
        Report {
            strategy: Strategy::AllSettled,
            timeout_ms: 3000,
            elapsed_ms: 1234,
            result,
        }
    }

    #[test]
    fn timeout_failure_gets_its_own_variant() {
        let timeout = TimeoutError::new(Duration::from_millis(5));
        assert_eq!(
            ReportResult::from_failure(TaskFailure::TimedOut(timeout.clone())),
            ReportResult::TimedOut { error: timeout }
        );
        assert!(matches!(
            ReportResult::from_failure(TaskFailure::Aborted),
            ReportResult::Failed {
                reason: TaskFailure::Aborted
            }
        ));
    }

    #[test]
    fn settled_report_counts_as_success() {
        let r = report(ReportResult::Settled {
            outcomes: vec![Outcome::Rejected(TaskFailure::Rejected("x".to_string()))],
        });
        assert!(r.succeeded());
    }

    #[test]
    fn timed_out_report_is_not_success() {
        let r = report(ReportResult::TimedOut {
            error: TimeoutError::new(Duration::from_millis(5)),
        });
        assert!(!r.succeeded());
    }

    #[test]
    fn render_settled_marks_each_target() {
        let targets = vec!["a".to_string(), "b".to_string()];
        let r = report(ReportResult::Settled {
            outcomes: vec![
                Outcome::Fulfilled("A\n".to_string()),
                Outcome::Rejected(TaskFailure::Rejected("B-fail".to_string())),
            ],
        });
        let text = render(&r, &targets);
        assert!(text.contains("[a] ✓ A\n"));
        assert!(text.contains("[b] ✗ B-fail"));
        assert!(text.contains("all-settled in 1,234 ms (limit 3,000 ms)"));
    }

    #[test]
    fn render_timeout() {
        let r = report(ReportResult::TimedOut {
            error: TimeoutError::new(Duration::from_millis(3000)),
        });
        let text = render(&r, &[]);
        assert!(text.starts_with("error: timeout: no task settled within 3000ms"));
    }

    #[test]
    fn render_values_pairs_bodies_with_targets() {
        let targets = vec!["a".to_string(), "b".to_string()];
        let r = report(ReportResult::Values {
            values: vec!["A\n".to_string(), "B".to_string()],
        });
        let text = render(&r, &targets);
        assert!(text.starts_with("  [a] ✓ A\n  [b] ✓ B\n"));
    }

    #[test]
    fn render_failed_lists_aggregate_reasons() {
        let r = report(ReportResult::Failed {
            reason: AggregateFailure::new(vec![
                TaskFailure::Rejected("one-down".to_string()),
                TaskFailure::Aborted,
            ])
            .into(),
        });
        let text = render(&r, &[]);
        assert!(text.starts_with("error: all 2 tasks rejected\n"));
        assert!(text.contains("[0] one-down"));
        assert!(text.contains("[1] task was aborted"));
        assert!(!r.succeeded());
    }

    #[test]
    fn report_serializes_kind_tag() {
        let r = report(ReportResult::Value {
            value: "hi".to_string(),
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["strategy"], "all-settled");
        assert_eq!(json["result"]["kind"], "value");
        assert_eq!(json["result"]["value"], "hi");
    }
}
