//! Step orchestration.
//!
//! [`Provisioner`] walks a plan's steps in declaration order, gating
//! each on its precondition, executing its action, and classifying the
//! result. A fatal failure halts the run before the next step; steps
//! marked `allow_failure` are recorded and execution continues.

use crate::facts::HostFacts;
use crate::plan::StepConfig;
use crate::provision::action::execute_action;
use crate::provision::changed::classify;
use crate::provision::precondition::run_check;
use crate::provision::step::{display_title, ExecutionResult, RunReport};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Progress notifications emitted while a run executes.
#[derive(Debug)]
pub enum StepEvent<'a> {
    /// A step is about to execute.
    Started {
        name: &'a str,
        title: &'a str,
        index: usize,
        total: usize,
    },

    /// A step reached a terminal state.
    Finished { result: &'a ExecutionResult },
}

/// Options controlling a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Evaluate preconditions and report, but execute nothing.
    pub dry_run: bool,

    /// Execute actions even when their precondition is satisfied.
    pub force: bool,

    /// Restrict the run to these step names (empty means all).
    pub only: Vec<String>,

    /// Step names to leave out of the run.
    pub skip: Vec<String>,
}

impl RunOptions {
    /// Whether a step name survives the `only`/`skip` filters.
    ///
    /// The consent prompt and the runner both go through this, so what
    /// the user is asked about is exactly what will execute.
    pub fn selects(&self, name: &str) -> bool {
        if self.skip.iter().any(|s| s == name) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|s| s == name)
    }

    /// Filter names that match no step in the plan, in the order given.
    pub fn unmatched_names(&self, steps: &[StepConfig]) -> Vec<String> {
        self.only
            .iter()
            .chain(self.skip.iter())
            .filter(|name| !steps.iter().any(|s| &s.name == *name))
            .cloned()
            .collect()
    }
}

/// Executes a plan's steps against the host.
pub struct Provisioner<'a> {
    facts: &'a HostFacts,
    global_env: &'a HashMap<String, String>,
    options: RunOptions,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        facts: &'a HostFacts,
        global_env: &'a HashMap<String, String>,
        options: RunOptions,
    ) -> Self {
        Self {
            facts,
            global_env,
            options,
        }
    }

    /// Run the selected steps in order, reporting progress through
    /// `observer`.
    pub fn run(
        &self,
        steps: &[StepConfig],
        observer: &mut dyn FnMut(StepEvent<'_>),
    ) -> RunReport {
        for name in self.options.unmatched_names(steps) {
            warn!("--only/--skip name '{}' matches no step", name);
        }

        let selected: Vec<&StepConfig> = steps
            .iter()
            .filter(|s| self.options.selects(&s.name))
            .collect();

        let mut report = RunReport::default();
        // Finished step name -> whether it changed the host.
        let mut ledger: HashMap<String, bool> = HashMap::new();
        let total = selected.len();

        for (index, step) in selected.into_iter().enumerate() {
            observer(StepEvent::Started {
                name: &step.name,
                title: display_title(step),
                index,
                total,
            });

            let result = self.run_step(step, &ledger);

            match result.status {
                crate::provision::StepStatus::Failed => {
                    if step.allow_failure {
                        warn!("step '{}' failed (ignored): {}", step.name, result.message);
                    } else {
                        report.failed = Some(step.name.clone());
                    }
                }
                status => {
                    let changed = result.changed();
                    info!("step '{}' {}: {}", step.name, status, result.message);
                    ledger.insert(step.name.clone(), changed);
                }
            }

            observer(StepEvent::Finished { result: &result });
            let fatal = report.failed.is_some();
            report.results.push(result);

            if fatal {
                break;
            }
        }

        report
    }

    fn run_step(&self, step: &StepConfig, ledger: &HashMap<String, bool>) -> ExecutionResult {
        let start = Instant::now();

        if let Some(check) = &step.precondition {
            if !self.options.force {
                match run_check(check, self.facts, ledger) {
                    Ok(result) if result.satisfied => {
                        return ExecutionResult::skipped(&step.name, result.description);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return ExecutionResult::failed(
                            &step.name,
                            format!("precondition check failed: {}", e),
                            start.elapsed(),
                        );
                    }
                }
            }
        }

        if self.options.dry_run {
            return ExecutionResult::skipped(&step.name, "would run (dry-run)".to_string());
        }

        match execute_action(step, self.facts, ledger, self.global_env) {
            Ok(outcome) if outcome.success => {
                let changed = outcome.changed.unwrap_or_else(|| {
                    let rule = step.changed_when.clone().unwrap_or_default();
                    classify(&rule, &outcome.output)
                });
                ExecutionResult::ran(&step.name, changed, outcome.message, start.elapsed())
            }
            Ok(outcome) => {
                ExecutionResult::failed(&step.name, outcome.message, start.elapsed())
            }
            Err(e) => ExecutionResult::failed(&step.name, e.to_string(), start.elapsed()),
        }
    }

}
