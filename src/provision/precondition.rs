//! Precondition evaluation.
//!
//! Preconditions probe the host (never modify it) to decide whether a
//! step's action still needs to run. Paths and commands go through fact
//! interpolation first, so plans can write `${home}/.oh-my-zsh` instead
//! of hardcoding a user.

use crate::error::{Result, RigupError};
use crate::facts::HostFacts;
use crate::plan::{resolve_string, Precondition};
use crate::shell::{execute_quiet, resolve_executable};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of evaluating one precondition.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Whether the check passed (the step can be skipped).
    pub satisfied: bool,

    /// Human-readable description of what was checked.
    pub description: String,
}

impl CheckResult {
    fn new(satisfied: bool, description: String) -> Self {
        Self {
            satisfied,
            description,
        }
    }
}

/// Evaluate a precondition against the host.
///
/// `ledger` maps names of already-finished steps to their changed flag,
/// backing the `step_unchanged` check. Probe failures (command errors,
/// bad regex at runtime) surface as errors rather than silently reading
/// as "unsatisfied".
pub fn run_check(
    check: &Precondition,
    facts: &HostFacts,
    ledger: &HashMap<String, bool>,
) -> Result<CheckResult> {
    match check {
        Precondition::FileExists { path } => {
            let resolved = resolve_string(path, facts)?;
            let exists = std::path::Path::new(&resolved).exists();
            debug!("file_exists {} -> {}", resolved, exists);
            Ok(CheckResult::new(exists, format!("file {} exists", resolved)))
        }

        Precondition::ExecutableOnPath { name } => {
            let found = resolve_executable(name).is_some();
            Ok(CheckResult::new(found, format!("{} on PATH", name)))
        }

        Precondition::CommandSucceeds { command } => {
            let resolved = resolve_string(command, facts)?;
            let result = execute_quiet(&resolved, None)?;
            Ok(CheckResult::new(
                result.success,
                format!("`{}` exits zero", resolved),
            ))
        }

        Precondition::OutputContains { command, substring } => {
            let resolved = resolve_string(command, facts)?;
            let result = execute_quiet(&resolved, None)?;
            Ok(CheckResult::new(
                result.stdout.contains(substring.as_str()),
                format!("`{}` output contains '{}'", resolved, substring),
            ))
        }

        Precondition::OutputMatches { command, pattern } => {
            let resolved = resolve_string(command, facts)?;
            let regex =
                regex::Regex::new(pattern).map_err(|e| RigupError::PlanValidationError {
                    message: format!("invalid pattern '{}': {}", pattern, e),
                })?;
            let result = execute_quiet(&resolved, None)?;
            Ok(CheckResult::new(
                regex.is_match(&result.stdout),
                format!("`{}` output matches /{}/", resolved, pattern),
            ))
        }

        Precondition::StepUnchanged { step } => {
            // Absent means the step has not run this invocation, which
            // cannot count as "ran without changes".
            let satisfied = ledger.get(step.as_str()) == Some(&false);
            Ok(CheckResult::new(
                satisfied,
                format!("step '{}' ran without changes", step),
            ))
        }

        Precondition::All { checks } => {
            for inner in checks {
                let result = run_check(inner, facts, ledger)?;
                if !result.satisfied {
                    return Ok(CheckResult::new(
                        false,
                        format!("not satisfied: {}", result.description),
                    ));
                }
            }
            Ok(CheckResult::new(true, "all checks satisfied".to_string()))
        }

        Precondition::Any { checks } => {
            for inner in checks {
                let result = run_check(inner, facts, ledger)?;
                if result.satisfied {
                    return Ok(CheckResult::new(
                        true,
                        format!("satisfied: {}", result.description),
                    ));
                }
            }
            Ok(CheckResult::new(false, "no check satisfied".to_string()))
        }
    }
}
