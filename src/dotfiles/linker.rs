//! Symlink deployment of a dotfiles directory.
//!
//! Mirrors the top level of a source directory (a cloned dotfiles repo)
//! into a target directory (usually `$HOME`) as symlinks. Entries are
//! force-linked: an existing file or stale link at the destination is
//! replaced, and a link that already resolves to the source counts as
//! unchanged, keeping repeated deployments idempotent.

use crate::error::{Result, RigupError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a [`link`] pass did.
#[derive(Debug, Default)]
pub struct LinkOutcome {
    /// Links created where nothing existed.
    pub created: Vec<String>,

    /// Links that replaced an existing file or re-pointed a stale link.
    pub replaced: Vec<String>,

    /// Links that already resolved to the source.
    pub unchanged: Vec<String>,
}

impl LinkOutcome {
    /// Whether the pass altered the target directory at all.
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.replaced.is_empty()
    }

    fn record(&mut self, entry: &str, change: LinkChange) {
        match change {
            LinkChange::Created => self.created.push(entry.to_string()),
            LinkChange::Replaced => self.replaced.push(entry.to_string()),
            LinkChange::Unchanged => self.unchanged.push(entry.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkChange {
    Created,
    Replaced,
    Unchanged,
}

/// List the top level of a source directory.
///
/// Non-recursive, hidden entries included, names in `exclude` dropped
/// (version-control metadata like `.git`). Returned sorted so linking
/// order is deterministic.
pub fn enumerate(source_dir: &Path, exclude: &[String]) -> Result<Vec<String>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(source_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if exclude.iter().any(|x| x == &name) {
            continue;
        }
        entries.push(name);
    }

    entries.sort();
    Ok(entries)
}

/// Symlink `entries` from `source_dir` into `target_dir`.
///
/// Directory entries are normally mirrored per-file: a real directory is
/// created at the target and each contained file is linked individually,
/// so locally added files inside it survive. Directories named in
/// `link_as_dir` (editor config folders) become one whole-directory
/// symlink instead.
///
/// # Errors
///
/// Returns [`RigupError::LinkTargetMissing`] when `target_dir` does not
/// exist; partial state from earlier entries is left in place (rerun is
/// the recovery path).
pub fn link(
    source_dir: &Path,
    target_dir: &Path,
    entries: &[String],
    link_as_dir: &[String],
) -> Result<LinkOutcome> {
    if !target_dir.is_dir() {
        return Err(RigupError::LinkTargetMissing {
            path: target_dir.to_path_buf(),
        });
    }

    let mut outcome = LinkOutcome::default();

    for entry in entries {
        let source = source_dir.join(entry);
        let target = target_dir.join(entry);

        if source.is_dir() && !link_as_dir.iter().any(|d| d == entry) {
            link_dir_contents(&source, &target, entry, &mut outcome)?;
        } else {
            let change = force_symlink(&source, &target)?;
            outcome.record(entry, change);
        }
    }

    debug!(
        created = outcome.created.len(),
        replaced = outcome.replaced.len(),
        unchanged = outcome.unchanged.len(),
        "link pass complete"
    );

    Ok(outcome)
}

/// Mirror a directory per-file: real directories, linked leaves.
fn link_dir_contents(
    source: &Path,
    target: &Path,
    prefix: &str,
    outcome: &mut LinkOutcome,
) -> Result<()> {
    if target.is_symlink() {
        // A whole-dir link from an earlier layout blocks per-file
        // mirroring; replace it with a real directory.
        fs::remove_file(target)?;
    }
    fs::create_dir_all(target)?;

    let mut names: Vec<_> = fs::read_dir(source)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        let child_source = source.join(&name);
        let child_target = target.join(&name);
        let child_entry = format!("{}/{}", prefix, name);

        if child_source.is_dir() {
            link_dir_contents(&child_source, &child_target, &child_entry, outcome)?;
        } else {
            let change = force_symlink(&child_source, &child_target)?;
            outcome.record(&child_entry, change);
        }
    }

    Ok(())
}

/// Create `target` as a symlink to `source`, replacing whatever is there.
///
/// Replacement goes through a temporary link renamed over the
/// destination, so the target path never observes a missing entry.
fn force_symlink(source: &Path, target: &Path) -> Result<LinkChange> {
    let existed = target.symlink_metadata().is_ok();

    if existed && fs::read_link(target).map(|dest| dest == source).unwrap_or(false) {
        return Ok(LinkChange::Unchanged);
    }

    // A real directory cannot be renamed over; clear it first.
    if existed && target.is_dir() && !target.is_symlink() {
        fs::remove_dir_all(target)?;
    }

    let staging = staging_path(target);
    let _ = fs::remove_file(&staging);
    symlink(source, &staging)?;
    fs::rename(&staging, target)?;

    Ok(if existed {
        LinkChange::Replaced
    } else {
        LinkChange::Created
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.rigup-staging", name))
}

#[cfg(unix)]
fn symlink(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink(source: &Path, link: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, link)
    } else {
        std::os::windows::fs::symlink_file(source, link)
    }
}
