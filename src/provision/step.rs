//! Step state and per-run results.
//!
//! A step moves through a small state machine during a run:
//! `Pending -> Running -> Skipped | Unchanged | Changed | Failed`.
//! The terminal state distinguishes "ran but the host already matched"
//! from "ran and altered the host", which is what makes a second run
//! verifiable as a no-op.

use crate::plan::StepConfig;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Execution state of a step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet reached.
    Pending,

    /// Currently executing.
    Running,

    /// Precondition satisfied; action not run.
    Skipped,

    /// Action ran and made no observable change.
    Unchanged,

    /// Action ran and altered the host.
    Changed,

    /// Action ran and failed.
    Failed,
}

impl StepStatus {
    /// Whether the step has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::Unchanged | Self::Changed | Self::Failed
        )
    }

    /// Single-character marker for compact summaries.
    pub fn display_char(&self) -> char {
        match self {
            Self::Pending => '.',
            Self::Running => '>',
            Self::Skipped => '-',
            Self::Unchanged => '=',
            Self::Changed => '+',
            Self::Failed => 'x',
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Skipped => "skipped",
            Self::Unchanged => "ok",
            Self::Changed => "changed",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Result of executing one step.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Step name.
    pub step: String,

    /// Terminal status.
    pub status: StepStatus,

    /// Human-readable detail (skip reason, change summary, error).
    pub message: String,

    /// Wall-clock duration of the step.
    #[serde(skip)]
    pub duration: Duration,
}

impl ExecutionResult {
    /// A step skipped because its precondition was satisfied.
    pub fn skipped(step: &str, reason: String) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Skipped,
            message: reason,
            duration: Duration::ZERO,
        }
    }

    /// A step that ran to completion.
    pub fn ran(step: &str, changed: bool, message: String, duration: Duration) -> Self {
        Self {
            step: step.to_string(),
            status: if changed {
                StepStatus::Changed
            } else {
                StepStatus::Unchanged
            },
            message,
            duration,
        }
    }

    /// A step that failed.
    pub fn failed(step: &str, message: String, duration: Duration) -> Self {
        Self {
            step: step.to_string(),
            status: StepStatus::Failed,
            message,
            duration,
        }
    }

    /// Whether this result counts as a change to the host.
    pub fn changed(&self) -> bool {
        self.status == StepStatus::Changed
    }

    /// One-line summary for reports and logs.
    pub fn summary_line(&self) -> String {
        if self.duration.is_zero() {
            format!("[{}] {} ({})", self.status, self.step, self.message)
        } else {
            format!(
                "[{}] {} ({}) in {}",
                self.status,
                self.step,
                self.message,
                format_duration(self.duration)
            )
        }
    }
}

/// Outcome of an entire run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Per-step results, in execution order.
    pub results: Vec<ExecutionResult>,

    /// Name of the step whose fatal failure halted the run, if any.
    pub failed: Option<String>,
}

impl RunReport {
    /// Names of steps that changed the host.
    pub fn changed_steps(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.changed())
            .map(|r| r.step.as_str())
            .collect()
    }

    /// Whether the run completed without a fatal failure.
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }

    /// Count of results with the given status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Display title for a step: explicit title, else its name.
pub fn display_title(config: &StepConfig) -> &str {
    config.title.as_deref().unwrap_or(&config.name)
}

/// Render a duration compactly (`850ms`, `3.2s`, `2m05s`).
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = d.as_secs() / 60;
        format!("{}m{:02}s", mins, d.as_secs() % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
        assert!(StepStatus::Skipped.is_terminal());
        assert!(StepStatus::Unchanged.is_terminal());
        assert!(StepStatus::Changed.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
    }

    #[test]
    fn ran_maps_changed_flag_to_status() {
        let r = ExecutionResult::ran("a", true, "did things".into(), Duration::from_millis(10));
        assert_eq!(r.status, StepStatus::Changed);
        assert!(r.changed());

        let r = ExecutionResult::ran("a", false, "already done".into(), Duration::from_millis(10));
        assert_eq!(r.status, StepStatus::Unchanged);
        assert!(!r.changed());
    }

    #[test]
    fn skipped_is_not_a_change() {
        let r = ExecutionResult::skipped("a", "marker present".into());
        assert!(!r.changed());
        assert_eq!(r.status, StepStatus::Skipped);
    }

    #[test]
    fn report_counts_and_changed_steps() {
        let mut report = RunReport::default();
        report.results.push(ExecutionResult::skipped("one", "present".into()));
        report.results.push(ExecutionResult::ran(
            "two",
            true,
            "linked".into(),
            Duration::from_millis(5),
        ));
        report.results.push(ExecutionResult::ran(
            "three",
            false,
            "up to date".into(),
            Duration::from_millis(5),
        ));

        assert_eq!(report.changed_steps(), vec!["two"]);
        assert_eq!(report.count(StepStatus::Skipped), 1);
        assert_eq!(report.count(StepStatus::Unchanged), 1);
        assert!(report.succeeded());
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(3200)), "3.2s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn summary_line_includes_status_and_step() {
        let r = ExecutionResult::failed("pkg", "exit code 1".into(), Duration::from_secs(2));
        let line = r.summary_line();
        assert!(line.contains("failed"));
        assert!(line.contains("pkg"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&StepStatus::Unchanged).unwrap();
        assert_eq!(json, "\"unchanged\"");
    }
}
