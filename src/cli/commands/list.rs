//! List command implementation.
//!
//! The `rigup list` command shows the plan's steps in execution order.

use std::path::{Path, PathBuf};

use crate::cli::args::ListArgs;
use crate::error::{Result, RigupError};
use crate::plan;
use crate::ui::{RigupTheme, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// The list command implementation.
pub struct ListCommand {
    cwd: PathBuf,
    plan_path: Option<PathBuf>,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(cwd: &Path, plan_path: Option<&Path>, args: ListArgs) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            plan_path: plan_path.map(|p| p.to_path_buf()),
            args,
        }
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let path = match plan::find_plan(self.plan_path.as_deref(), &self.cwd) {
            Ok(p) => p,
            Err(RigupError::PlanNotFound { .. }) => {
                ui.error("No plan found. Run 'rigup init' first.");
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let plan = plan::load_plan(&path)?;

        if self.args.json {
            let listing: Vec<serde_json::Value> = plan
                .steps
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "kind": s.action.kind(),
                        "elevated": s.elevated,
                        "allow_failure": s.allow_failure,
                        "guarded": s.precondition.is_some(),
                    })
                })
                .collect();
            ui.message(&serde_json::to_string_pretty(&listing).map_err(anyhow::Error::from)?);
            return Ok(CommandResult::success());
        }

        let theme = RigupTheme::new();
        let title = plan.name.as_deref().unwrap_or("workstation");
        ui.message(&format!("Plan: {} ({})", title, path.display()));

        for (index, step) in plan.steps.iter().enumerate() {
            let mut tags = Vec::new();
            if step.elevated {
                tags.push("elevated");
            }
            if step.allow_failure {
                tags.push("best-effort");
            }
            if step.precondition.is_some() {
                tags.push("guarded");
            }
            let suffix = if tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", tags.join(", "))
            };

            ui.message(&format!(
                "  {} {} {}{}",
                theme.step_number.apply_to(format!("{}.", index + 1)),
                theme.highlight.apply_to(&step.name),
                theme.dim.apply_to(step.action.kind()),
                suffix
            ));
        }

        Ok(CommandResult::success())
    }
}
