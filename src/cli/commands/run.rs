//! Run command implementation.
//!
//! The `rigup run` command executes the provisioning plan.

use std::path::{Path, PathBuf};

use crate::cli::args::RunArgs;
use crate::error::{Result, RigupError};
use crate::facts::HostFacts;
use crate::plan::{self, Plan};
use crate::provision::{
    format_duration, Provisioner, RunOptions, RunReport, StepEvent, StepStatus,
};
use crate::shell::is_ci;
use crate::ui::{SpinnerHandle, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    cwd: PathBuf,
    plan_path: Option<PathBuf>,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(cwd: &Path, plan_path: Option<&Path>, args: RunArgs) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            plan_path: plan_path.map(|p| p.to_path_buf()),
            args,
        }
    }

    fn build_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.args.dry_run,
            force: self.args.force,
            only: self.args.only.clone(),
            skip: self.args.skip.clone(),
        }
    }

    /// Whether the plan needs an up-front confirmation for elevation.
    ///
    /// Asked once, before the first step, so credentials and consent are
    /// settled before the host is touched.
    fn needs_elevation_consent(&self, plan: &Plan, options: &RunOptions) -> bool {
        if self.args.yes || self.args.non_interactive || self.args.dry_run || is_ci() {
            return false;
        }
        plan.steps
            .iter()
            .filter(|s| options.selects(&s.name))
            .any(|s| s.elevated || s.action.kind() == "package_install" || s.action.kind() == "change_shell" || s.action.kind() == "build")
    }

    fn print_summary(&self, report: &RunReport, ui: &mut dyn UserInterface) {
        let changed = report.count(StepStatus::Changed);
        let unchanged = report.count(StepStatus::Unchanged);
        let skipped = report.count(StepStatus::Skipped);
        let failed = report.count(StepStatus::Failed);

        ui.message(&format!(
            "{} changed, {} ok, {} skipped, {} failed",
            changed, unchanged, skipped, failed
        ));

        if let Some(step) = &report.failed {
            ui.error(&format!("Provisioning halted: step '{}' failed", step));
        } else if changed == 0 && failed == 0 {
            ui.success("Host already provisioned; nothing to do");
        } else if failed == 0 {
            ui.success("Provisioning complete");
        }
    }
}

impl Command for RunCommand {
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
        let facts = HostFacts::resolve()?;

        let title = plan.name.as_deref().unwrap_or("workstation");
        ui.show_header(&format!("Provisioning {}", title));
        if self.args.dry_run {
            ui.message("Dry run: preconditions only, no actions executed");
        }

        let options = self.build_options();
        for name in options.unmatched_names(&plan.steps) {
            ui.warning(&format!("'{}' does not name a step in this plan", name));
        }

        if self.needs_elevation_consent(&plan, &options) {
            let proceed = ui.confirm(
                "Some steps run with elevated privileges (sudo). Continue?",
                true,
            )?;
            if !proceed {
                ui.message("Aborted before any step ran");
                return Ok(CommandResult::failure(1));
            }
        }

        let provisioner = Provisioner::new(&facts, &plan.settings.env, options);

        let mut spinner: Option<Box<dyn SpinnerHandle>> = None;
        let verbose = ui.output_mode().shows_command_output();
        let report = provisioner.run(&plan.steps, &mut |event| match event {
            StepEvent::Started {
                title,
                index,
                total,
                ..
            } => {
                spinner = Some(ui.start_spinner(&format!("[{}/{}] {}", index + 1, total, title)));
            }
            StepEvent::Finished { result } => {
                if let Some(mut handle) = spinner.take() {
                    let line = if result.duration.is_zero() {
                        format!("{} ({})", result.step, result.message)
                    } else {
                        format!(
                            "{} ({}) {}",
                            result.step,
                            result.message,
                            format_duration(result.duration)
                        )
                    };
                    match result.status {
                        StepStatus::Skipped => handle.finish_skipped(&line),
                        StepStatus::Failed => handle.finish_error(&line),
                        _ => handle.finish_success(&line),
                    }
                }
                if verbose {
                    ui.message(&result.summary_line());
                }
            }
        });

        self.print_summary(&report, ui);

        if report.succeeded() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan;
    use crate::ui::MockUI;

    fn temp_plan(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("rigup.yml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn missing_plan_is_a_clean_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let cmd = RunCommand::new(temp.path(), None, RunArgs::default());
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
        assert!(ui.errors()[0].contains("rigup init"));
    }

    #[test]
    fn plain_plan_needs_no_consent() {
        let yaml = r#"
steps:
  - name: hello
    action: { type: command, command: "true" }
"#;
        let plan = parse_plan(yaml, Path::new("rigup.yml")).unwrap();
        let cmd = RunCommand::new(Path::new("."), None, RunArgs::default());
        let options = cmd.build_options();
        assert!(!cmd.needs_elevation_consent(&plan, &options));
    }

    #[test]
    fn elevated_step_requires_consent_unless_yes() {
        let yaml = r#"
steps:
  - name: packages
    elevated: true
    action: { type: package_install, packages: [tmux] }
"#;
        let plan = parse_plan(yaml, Path::new("rigup.yml")).unwrap();

        let cmd = RunCommand::new(Path::new("."), None, RunArgs::default());
        let options = cmd.build_options();
        if !is_ci() {
            assert!(cmd.needs_elevation_consent(&plan, &options));
        }

        let args = RunArgs {
            yes: true,
            ..Default::default()
        };
        let cmd = RunCommand::new(Path::new("."), None, args);
        let options = cmd.build_options();
        assert!(!cmd.needs_elevation_consent(&plan, &options));
    }

    #[test]
    fn consent_check_honors_step_filters() {
        let yaml = r#"
steps:
  - name: packages
    elevated: true
    action: { type: package_install, packages: [tmux] }
  - name: hello
    action: { type: command, command: "true" }
"#;
        let plan = parse_plan(yaml, Path::new("rigup.yml")).unwrap();
        let args = RunArgs {
            skip: vec!["packages".to_string()],
            ..Default::default()
        };
        let cmd = RunCommand::new(Path::new("."), None, args);
        let options = cmd.build_options();
        assert!(!cmd.needs_elevation_consent(&plan, &options));
    }

    #[test]
    fn misspelled_only_name_draws_a_warning() {
        let temp = tempfile::TempDir::new().unwrap();
        let yaml = r#"
steps:
  - name: touch
    action: { type: command, command: "true" }
"#;
        let path = temp_plan(temp.path(), yaml);

        let args = RunArgs {
            yes: true,
            only: vec!["tuoch".to_string()],
            ..Default::default()
        };
        let cmd = RunCommand::new(temp.path(), Some(&path), args);
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(result.success);
        assert!(ui.warnings().iter().any(|w| w.contains("tuoch")));
    }

    #[test]
    fn run_executes_plan_and_reports() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("done.txt");
        let yaml = format!(
            r#"
steps:
  - name: touch
    action: {{ type: command, command: "touch '{}'" }}
"#,
            marker.display()
        );
        let path = temp_plan(temp.path(), &yaml);

        let args = RunArgs {
            yes: true,
            ..Default::default()
        };
        let cmd = RunCommand::new(temp.path(), Some(&path), args);
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(result.success);
        assert!(marker.exists());
    }

    #[test]
    fn failing_step_yields_nonzero_exit() {
        let temp = tempfile::TempDir::new().unwrap();
        let yaml = r#"
steps:
  - name: boom
    action: { type: command, command: "exit 1" }
"#;
        let path = temp_plan(temp.path(), yaml);

        let args = RunArgs {
            yes: true,
            ..Default::default()
        };
        let cmd = RunCommand::new(temp.path(), Some(&path), args);
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(ui.errors().iter().any(|e| e.contains("boom")));
    }
}
