//! Host facts resolved once per run.
//!
//! [`HostFacts`] captures the ambient values every step may reference:
//! home directory, invoking user, current login shell, and whether the
//! process already runs elevated. Facts are resolved once at startup and
//! are read-only afterwards; steps receive them by shared reference.

use crate::error::{Result, RigupError};
use serde::Serialize;
use std::path::PathBuf;

/// Ambient host values, resolved once and passed into every step.
#[derive(Debug, Clone, Serialize)]
pub struct HostFacts {
    /// Home directory of the invoking user.
    pub home: PathBuf,

    /// Invoking username.
    pub user: String,

    /// Login shell recorded for the user, if the account database or
    /// environment reports one.
    pub login_shell: Option<PathBuf>,

    /// Whether the process is already running as root/admin.
    pub elevated: bool,
}

impl HostFacts {
    /// Resolve facts from the current environment.
    pub fn resolve() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| RigupError::PlanValidationError {
            message: "cannot determine home directory".to_string(),
        })?;

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .map_err(|_| RigupError::PlanValidationError {
                message: "cannot determine invoking user (USER and LOGNAME unset)".to_string(),
            })?;

        // chsh rewrites the passwd entry, not $SHELL, so the account
        // database is authoritative; $SHELL is only a fallback.
        let login_shell = login_shell_from_passwd(&user)
            .or_else(|| std::env::var_os("SHELL").map(PathBuf::from));

        Ok(Self {
            home,
            user,
            login_shell,
            elevated: crate::shell::is_elevated(),
        })
    }

    /// Look up a fact by interpolation key.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "home" => Some(self.home.to_string_lossy().into_owned()),
            "user" => Some(self.user.clone()),
            "shell" => self
                .login_shell
                .as_ref()
                .map(|s| s.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

/// Login shell recorded in the account database for `user`.
///
/// `$SHELL` is inherited from the session that launched the process and
/// goes stale the moment `chsh` rewrites the passwd entry, so lookups go
/// through `getent` (NSS-aware), falling back to reading `/etc/passwd`.
pub fn login_shell_from_passwd(user: &str) -> Option<PathBuf> {
    if user.is_empty() {
        return None;
    }

    if let Ok(result) = crate::shell::execute_quiet(&format!("getent passwd '{}'", user), None) {
        if result.success {
            if let Some(shell) = passwd_shell_field(result.stdout.trim()) {
                return Some(shell);
            }
        }
    }

    let passwd = std::fs::read_to_string("/etc/passwd").ok()?;
    passwd
        .lines()
        .find(|line| line.split(':').next() == Some(user))
        .and_then(passwd_shell_field)
}

/// Seventh colon-separated field of a passwd line.
fn passwd_shell_field(line: &str) -> Option<PathBuf> {
    let field = line.split(':').nth(6)?.trim();
    if field.is_empty() {
        None
    } else {
        Some(PathBuf::from(field))
    }
}
