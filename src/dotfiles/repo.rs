//! Clone-or-pull syncing of a git repository.
//!
//! Changed-ness is detected structurally: a fresh clone is always a
//! change, and a pull counts as one only when `rev-parse HEAD` differs
//! before and after. Output substrings ("Already up to date.") are never
//! consulted.

use crate::error::{Result, RigupError};
use crate::shell::execute_quiet;
use std::path::Path;
use tracing::{debug, info};

/// Result of syncing a repository.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Whether the working tree moved (fresh clone or fast-forward).
    pub changed: bool,

    /// Whether this sync performed the initial clone.
    pub cloned: bool,

    /// HEAD commit after the sync, when resolvable.
    pub head: Option<String>,
}

/// Clone `url` into `dest`, or fast-forward an existing checkout.
pub fn clone_or_pull(url: &str, dest: &Path, branch: Option<&str>) -> Result<SyncOutcome> {
    if dest.join(".git").exists() {
        pull(url, dest)
    } else {
        clone(url, dest, branch)
    }
}

fn clone(url: &str, dest: &Path, branch: Option<&str>) -> Result<SyncOutcome> {
    info!("cloning {} into {}", url, dest.display());

    let branch_arg = branch
        .map(|b| format!(" --branch '{}'", b))
        .unwrap_or_default();
    let command = format!("git clone{} '{}' '{}'", branch_arg, url, dest.display());

    let result = execute_quiet(&command, None)?;
    if !result.success {
        return Err(RigupError::CommandFailed {
            command,
            code: result.exit_code,
        });
    }

    Ok(SyncOutcome {
        changed: true,
        cloned: true,
        head: rev_parse_head(dest),
    })
}

fn pull(url: &str, dest: &Path) -> Result<SyncOutcome> {
    let before = rev_parse_head(dest);
    debug!("pulling {} at HEAD {:?}", url, before);

    let command = format!("git -C '{}' pull --ff-only", dest.display());
    let result = execute_quiet(&command, None)?;
    if !result.success {
        return Err(RigupError::CommandFailed {
            command,
            code: result.exit_code,
        });
    }

    let after = rev_parse_head(dest);
    Ok(SyncOutcome {
        changed: before != after,
        cloned: false,
        head: after,
    })
}

/// Resolve HEAD of a checkout; None for an empty repository.
fn rev_parse_head(dest: &Path) -> Option<String> {
    let command = format!("git -C '{}' rev-parse HEAD", dest.display());
    execute_quiet(&command, None)
        .ok()
        .filter(|r| r.success)
        .map(|r| r.stdout.trim().to_string())
        .filter(|head| !head.is_empty())
}
