//! Init command implementation.
//!
//! The `rigup init` command writes a starter plan file into the current
//! directory. The starter plan is embedded at compile time so the binary
//! works standalone on a fresh machine.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};

use crate::cli::args::InitArgs;
use crate::error::{Result, RigupError};
use crate::plan::DEFAULT_PLAN_FILE;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Embedded starter plans.
static TEMPLATES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// The init command implementation.
pub struct InitCommand {
    cwd: PathBuf,
    args: InitArgs,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: &Path, args: InitArgs) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            args,
        }
    }

    /// The embedded starter plan contents.
    pub fn starter_plan() -> Result<&'static str> {
        TEMPLATES_DIR
            .get_file("workstation.yml")
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| RigupError::PlanNotFound {
                path: "templates/workstation.yml".into(),
            })
    }
}

impl Command for InitCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let target = self.cwd.join(DEFAULT_PLAN_FILE);

        if target.exists() && !self.args.force {
            ui.error(&format!(
                "{} already exists (use --force to overwrite)",
                target.display()
            ));
            return Ok(CommandResult::failure(1));
        }

        fs::write(&target, Self::starter_plan()?)?;
        ui.success(&format!("Wrote {}", target.display()));
        ui.message("Edit the plan, then provision with 'rigup run'");

        Ok(CommandResult::success())
    }
}
