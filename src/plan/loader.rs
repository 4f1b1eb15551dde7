//! Plan discovery, loading, and validation.

use crate::error::{Result, RigupError};
use crate::plan::schema::{ActionConfig, Plan, Precondition};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default plan file name looked up in the working directory.
pub const DEFAULT_PLAN_FILE: &str = "rigup.yml";

/// Locate the plan file.
///
/// Search order: an explicit `--plan` path, `rigup.yml` in the working
/// directory, then `~/.config/rigup/plan.yml`.
pub fn find_plan(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(RigupError::PlanNotFound {
            path: path.to_path_buf(),
        });
    }

    let local = cwd.join(DEFAULT_PLAN_FILE);
    if local.exists() {
        return Ok(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("rigup").join("plan.yml");
        if user.exists() {
            return Ok(user);
        }
    }

    Err(RigupError::PlanNotFound { path: local })
}

/// Load and validate a plan file.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RigupError::PlanNotFound {
                path: path.to_path_buf(),
            }
        } else {
            RigupError::Io(e)
        }
    })?;

    let plan = parse_plan(&content, path)?;
    validate_plan(&plan)?;
    Ok(plan)
}

/// Parse YAML content into a [`Plan`].
pub fn parse_plan(content: &str, source_path: &Path) -> Result<Plan> {
    serde_yaml::from_str(content).map_err(|e| RigupError::PlanParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Validate plan structure.
///
/// Checks:
/// - at least one step, unique step names
/// - `command` actions are non-empty
/// - `package_install` steps are flagged elevated
/// - `step_unchanged` preconditions and `source_step` references name an
///   earlier step (forward references would read an empty ledger)
pub fn validate_plan(plan: &Plan) -> Result<()> {
    if plan.steps.is_empty() {
        return Err(RigupError::PlanValidationError {
            message: "plan has no steps".to_string(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for step in &plan.steps {
        if step.name.trim().is_empty() {
            return Err(RigupError::PlanValidationError {
                message: "step with empty name".to_string(),
            });
        }
        if !seen.insert(step.name.as_str()) {
            return Err(RigupError::PlanValidationError {
                message: format!("duplicate step name '{}'", step.name),
            });
        }

        match &step.action {
            ActionConfig::Command { command } if command.trim().is_empty() => {
                return Err(RigupError::PlanValidationError {
                    message: format!("step '{}' has an empty command", step.name),
                });
            }
            ActionConfig::PackageInstall { packages } => {
                if packages.is_empty() {
                    return Err(RigupError::PlanValidationError {
                        message: format!("step '{}' installs no packages", step.name),
                    });
                }
                if !step.elevated {
                    return Err(RigupError::PlanValidationError {
                        message: format!(
                            "step '{}': package_install requires elevated: true",
                            step.name
                        ),
                    });
                }
            }
            ActionConfig::Build { source_step, .. } => {
                if let Some(source) = source_step {
                    check_back_reference(&step.name, source, &seen)?;
                }
            }
            _ => {}
        }

        if let Some(check) = &step.precondition {
            validate_precondition(&step.name, check, &seen)?;
        }
    }

    Ok(())
}

fn validate_precondition(
    step_name: &str,
    check: &Precondition,
    earlier: &HashSet<&str>,
) -> Result<()> {
    match check {
        Precondition::StepUnchanged { step } => check_back_reference(step_name, step, earlier),
        Precondition::All { checks } | Precondition::Any { checks } => {
            for check in checks {
                validate_precondition(step_name, check, earlier)?;
            }
            Ok(())
        }
        Precondition::OutputMatches { pattern, .. } => {
            regex::Regex::new(pattern).map_err(|e| RigupError::PlanValidationError {
                message: format!("step '{}': invalid pattern: {}", step_name, e),
            })?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_back_reference(step_name: &str, referenced: &str, earlier: &HashSet<&str>) -> Result<()> {
    // The referencing step is already in `earlier`; a self-reference is
    // as invalid as a forward one.
    if referenced == step_name || !earlier.contains(referenced) {
        return Err(RigupError::PlanValidationError {
            message: format!(
                "step '{}' references step '{}', which does not run before it",
                step_name, referenced
            ),
        });
    }
    Ok(())
}
