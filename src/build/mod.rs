//! Conditional source-build runner.
//!
//! Decides whether software needs rebuilding from a source checkout and,
//! when it does, runs clean/build/install in that order. Clean failures
//! are ignored (the tree may already be clean); the install command is
//! the only part that runs elevated.

use crate::error::{Result, RigupError};
use crate::shell::{execute, CommandOptions};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// The commands making up one source build.
#[derive(Debug, Clone)]
pub struct BuildSpec<'a> {
    /// Source checkout directory; all commands run here.
    pub source_dir: &'a Path,

    /// Best-effort cleanup command.
    pub clean: Option<&'a str>,

    /// Build command, run as the invoking user.
    pub build: &'a str,

    /// Install command, run elevated.
    pub install: &'a str,

    /// Extra environment for every command.
    pub env: &'a HashMap<String, String>,
}

/// Rebuild iff the binary is absent or the source was just updated.
pub fn should_build(binary_on_path: bool, source_changed: bool) -> bool {
    !binary_on_path || source_changed
}

/// Run a full clean/build/install cycle.
pub fn run_build(spec: &BuildSpec<'_>) -> Result<()> {
    if let Some(clean) = spec.clean {
        info!("cleaning in {}", spec.source_dir.display());
        let result = execute(clean, &options(spec, false))?;
        if !result.success {
            warn!(
                "clean command failed with exit code {:?}; continuing",
                result.exit_code
            );
        }
    }

    info!("building in {}", spec.source_dir.display());
    let result = execute(spec.build, &options(spec, false))?;
    if !result.success {
        return Err(RigupError::CommandFailed {
            command: spec.build.to_string(),
            code: result.exit_code,
        });
    }

    info!("installing from {}", spec.source_dir.display());
    let result = execute(spec.install, &options(spec, true))?;
    if !result.success {
        return Err(RigupError::CommandFailed {
            command: spec.install.to_string(),
            code: result.exit_code,
        });
    }

    Ok(())
}

fn options(spec: &BuildSpec<'_>, elevated: bool) -> CommandOptions {
    CommandOptions {
        cwd: Some(spec.source_dir.to_path_buf()),
        env: spec.env.clone(),
        capture_stdout: true,
        capture_stderr: true,
        elevated,
    }
}
