//! Action execution.
//!
//! [`execute_action`] dispatches a step's action and reports what it
//! observed. Structured actions (clone, link, build, shell change,
//! package install) determine their own changed flag; plain commands
//! leave it to the step's classifier by returning `changed: None`.

use crate::build::{run_build, should_build, BuildSpec};
use crate::dotfiles;
use crate::error::{Result, RigupError};
use crate::facts::HostFacts;
use crate::fetch::ScriptFetcher;
use crate::plan::{resolve_string, ActionConfig, StepConfig};
use crate::shell::{execute, execute_quiet, resolve_executable, CommandOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What executing an action produced.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Whether the action changed the host. `None` means the action
    /// cannot tell and the step's classifier decides.
    pub changed: Option<bool>,

    /// Captured output, for classifiers and failure reports.
    pub output: String,

    /// Whether the action completed successfully.
    pub success: bool,

    /// Human-readable summary of what happened.
    pub message: String,
}

impl ActionOutcome {
    fn ok(changed: Option<bool>, output: String, message: String) -> Self {
        Self {
            changed,
            output,
            success: true,
            message,
        }
    }

    fn failed(output: String, message: String) -> Self {
        Self {
            changed: None,
            output,
            success: false,
            message,
        }
    }
}

/// Execute one step's action against the host.
///
/// `ledger` maps finished step names to their changed flag; the build
/// action reads it to learn whether its source checkout just moved.
pub fn execute_action(
    step: &StepConfig,
    facts: &HostFacts,
    ledger: &HashMap<String, bool>,
    global_env: &HashMap<String, String>,
) -> Result<ActionOutcome> {
    let env = merged_env(global_env, &step.env);

    match &step.action {
        ActionConfig::Command { command } => {
            let resolved = resolve_string(command, facts)?;
            run_command(&resolved, &env, step.elevated)
        }

        ActionConfig::PackageInstall { packages } => install_packages(packages, &env),

        ActionConfig::FetchScript {
            url,
            sha256,
            interpreter,
        } => {
            let result = ScriptFetcher::default().fetch_and_run(
                url,
                sha256.as_deref(),
                interpreter.as_deref(),
                &env,
                step.elevated,
            )?;
            let output = collect_output(&result.stdout, &result.stderr);
            if result.success {
                Ok(ActionOutcome::ok(
                    None,
                    output,
                    format!("ran script from {}", url),
                ))
            } else {
                Ok(ActionOutcome::failed(
                    output,
                    format!("script from {} exited with {:?}", url, result.exit_code),
                ))
            }
        }

        ActionConfig::CloneRepo { url, dest, branch } => {
            let dest = PathBuf::from(resolve_string(dest, facts)?);
            let sync = dotfiles::clone_or_pull(url, &dest, branch.as_deref())?;
            let message = if sync.cloned {
                format!("cloned into {}", dest.display())
            } else if sync.changed {
                format!("fast-forwarded {}", dest.display())
            } else {
                format!("{} already up to date", dest.display())
            };
            Ok(ActionOutcome::ok(Some(sync.changed), String::new(), message))
        }

        ActionConfig::LinkDotfiles {
            source,
            target,
            exclude,
            link_as_dir,
        } => {
            let source = PathBuf::from(resolve_string(source, facts)?);
            let target = match target {
                Some(t) => PathBuf::from(resolve_string(t, facts)?),
                None => facts.home.clone(),
            };
            let entries = dotfiles::enumerate(&source, exclude)?;
            let outcome = dotfiles::link(&source, &target, &entries, link_as_dir)?;
            let message = format!(
                "{} created, {} replaced, {} unchanged",
                outcome.created.len(),
                outcome.replaced.len(),
                outcome.unchanged.len()
            );
            Ok(ActionOutcome::ok(
                Some(outcome.changed()),
                String::new(),
                message,
            ))
        }

        ActionConfig::ChangeShell { shell } => change_shell(shell, facts),

        ActionConfig::Build {
            source_dir,
            binary,
            source_step,
            clean,
            build,
            install,
        } => {
            let source_dir = PathBuf::from(resolve_string(source_dir, facts)?);
            let binary_on_path = resolve_executable(binary).is_some();
            let source_changed = source_step
                .as_ref()
                .and_then(|s| ledger.get(s.as_str()).copied())
                .unwrap_or(false);

            if !should_build(binary_on_path, source_changed) {
                return Ok(ActionOutcome::ok(
                    Some(false),
                    String::new(),
                    format!("{} present and source unchanged", binary),
                ));
            }

            run_build(&BuildSpec {
                source_dir: &source_dir,
                clean: clean.as_deref(),
                build,
                install,
                env: &env,
            })?;
            Ok(ActionOutcome::ok(
                Some(true),
                String::new(),
                format!("built and installed {}", binary),
            ))
        }
    }
}

fn run_command(
    command: &str,
    env: &HashMap<String, String>,
    elevated: bool,
) -> Result<ActionOutcome> {
    let result = execute(
        command,
        &CommandOptions {
            env: env.clone(),
            capture_stdout: true,
            capture_stderr: true,
            elevated,
            ..Default::default()
        },
    )?;

    let output = collect_output(&result.stdout, &result.stderr);
    if result.success {
        Ok(ActionOutcome::ok(None, output, format!("`{}` ok", command)))
    } else {
        Ok(ActionOutcome::failed(
            output,
            format!("`{}` exited with {:?}", command, result.exit_code),
        ))
    }
}

/// The system package managers rigup knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
}

impl PackageManager {
    /// Detect whichever manager is on PATH.
    pub fn detect() -> Option<Self> {
        if resolve_executable("apt-get").is_some() {
            Some(Self::Apt)
        } else if resolve_executable("dnf").is_some() {
            Some(Self::Dnf)
        } else if resolve_executable("pacman").is_some() {
            Some(Self::Pacman)
        } else {
            None
        }
    }

    /// Query command that exits zero iff the package is installed.
    pub fn query_command(&self, package: &str) -> String {
        match self {
            Self::Apt => format!("dpkg -s '{}'", package),
            Self::Dnf => format!("rpm -q '{}'", package),
            Self::Pacman => format!("pacman -Qi '{}'", package),
        }
    }

    /// Install command for a set of packages.
    pub fn install_command(&self, packages: &[String]) -> String {
        let list = packages.join(" ");
        match self {
            Self::Apt => format!("apt-get install -y {}", list),
            Self::Dnf => format!("dnf install -y {}", list),
            Self::Pacman => format!("pacman -S --noconfirm {}", list),
        }
    }
}

/// Install whichever of `packages` the package database does not already
/// know. Changed iff at least one package was actually installed.
fn install_packages(
    packages: &[String],
    env: &HashMap<String, String>,
) -> Result<ActionOutcome> {
    let manager = PackageManager::detect().ok_or_else(|| RigupError::ExecutableMissing {
        name: "apt-get/dnf/pacman".to_string(),
        context: "package_install action".to_string(),
    })?;

    let missing: Vec<String> = packages
        .iter()
        .filter(|p| !execute_quiet(&manager.query_command(p), None).map(|r| r.success).unwrap_or(false))
        .cloned()
        .collect();

    if missing.is_empty() {
        debug!("all {} packages already installed", packages.len());
        return Ok(ActionOutcome::ok(
            Some(false),
            String::new(),
            format!("{} packages already installed", packages.len()),
        ));
    }

    info!("installing packages: {}", missing.join(", "));
    let command = manager.install_command(&missing);
    let result = execute(
        &command,
        &CommandOptions {
            env: env.clone(),
            capture_stdout: true,
            capture_stderr: true,
            elevated: true,
            ..Default::default()
        },
    )?;

    let output = collect_output(&result.stdout, &result.stderr);
    if result.success {
        Ok(ActionOutcome {
            changed: Some(true),
            output,
            success: true,
            message: format!("installed {}", missing.join(", ")),
        })
    } else {
        Ok(ActionOutcome::failed(
            output,
            format!("package install exited with {:?}", result.exit_code),
        ))
    }
}

/// Change the invoking user's login shell with `chsh`.
///
/// Resolving the shell on PATH is mandatory; pointing a login shell at a
/// nonexistent binary locks the user out. The current shell comes from
/// the passwd entry rather than the `$SHELL` fact: chsh updates the
/// former but not the latter, and a rerun in the same session must still
/// see the switch as already done.
fn change_shell(shell: &str, facts: &HostFacts) -> Result<ActionOutcome> {
    let path = resolve_executable(shell).ok_or_else(|| RigupError::ExecutableMissing {
        name: shell.to_string(),
        context: "change_shell action".to_string(),
    })?;

    let current = crate::facts::login_shell_from_passwd(&facts.user)
        .or_else(|| facts.login_shell.clone());
    if current.map(|c| same_file(&c, &path)).unwrap_or(false) {
        return Ok(ActionOutcome::ok(
            Some(false),
            String::new(),
            format!("login shell already {}", path.display()),
        ));
    }

    let command = format!("chsh -s '{}' '{}'", path.display(), facts.user);
    let result = execute(
        &command,
        &CommandOptions {
            capture_stdout: true,
            capture_stderr: true,
            elevated: true,
            ..Default::default()
        },
    )?;

    if result.success {
        Ok(ActionOutcome::ok(
            Some(true),
            String::new(),
            format!("login shell set to {}", path.display()),
        ))
    } else {
        Ok(ActionOutcome::failed(
            collect_output(&result.stdout, &result.stderr),
            format!("chsh exited with {:?}", result.exit_code),
        ))
    }
}

/// Path equality through symlinks, so `/bin/zsh` and `/usr/bin/zsh`
/// compare equal on merged-usr systems.
fn same_file(a: &Path, b: &Path) -> bool {
    let canon = |p: &Path| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    canon(a) == canon(b)
}

fn merged_env(
    global: &HashMap<String, String>,
    step: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut env = global.clone();
    env.extend(step.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

fn collect_output(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepConfig;

    fn facts_with_home(home: &Path) -> HostFacts {
        HostFacts {
            home: home.to_path_buf(),
            user: "dev".to_string(),
            login_shell: Some(PathBuf::from("/bin/bash")),
            elevated: false,
        }
    }

    fn command_step(command: &str) -> StepConfig {
        StepConfig {
            name: "test".to_string(),
            title: None,
            description: None,
            action: ActionConfig::Command {
                command: command.to_string(),
            },
            precondition: None,
            changed_when: None,
            elevated: false,
            allow_failure: false,
            env: HashMap::new(),
        }
    }

    #[test]
    fn command_action_leaves_changed_undecided() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());

        let outcome = execute_action(
            &command_step("echo hello"),
            &facts,
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.changed, None);
        assert!(outcome.output.contains("hello"));
    }

    #[test]
    fn command_action_failure_is_reported_not_raised() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());

        let outcome = execute_action(
            &command_step("exit 7"),
            &facts,
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap();

        assert!(!outcome.success);
        assert!(outcome.message.contains("7"));
    }

    #[test]
    fn command_action_interpolates_facts() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());

        let outcome = execute_action(
            &command_step("echo ${user}"),
            &facts,
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap();

        assert!(outcome.output.contains("dev"));
    }

    #[test]
    fn command_action_sees_merged_env() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());
        let mut global = HashMap::new();
        global.insert("GLOBAL_VAR".to_string(), "from-global".to_string());

        let mut step = command_step("echo $GLOBAL_VAR $STEP_VAR");
        step.env
            .insert("STEP_VAR".to_string(), "from-step".to_string());

        let outcome = execute_action(&step, &facts, &HashMap::new(), &global).unwrap();
        assert!(outcome.output.contains("from-global"));
        assert!(outcome.output.contains("from-step"));
    }

    #[test]
    fn link_action_reports_structured_change() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("dotfiles");
        let target = temp.path().join("home");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(source.join(".bashrc"), "").unwrap();

        let facts = facts_with_home(&target);
        let mut step = command_step("unused");
        step.action = ActionConfig::LinkDotfiles {
            source: source.to_string_lossy().into_owned(),
            target: None,
            exclude: vec![],
            link_as_dir: vec![],
        };

        let first = execute_action(&step, &facts, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(first.changed, Some(true));

        let second = execute_action(&step, &facts, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(second.changed, Some(false));
    }

    #[test]
    fn build_action_skips_when_binary_present_and_source_unchanged() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());

        let mut step = command_step("unused");
        step.action = ActionConfig::Build {
            source_dir: temp.path().to_string_lossy().into_owned(),
            // `sh` is always on PATH
            binary: "sh".to_string(),
            source_step: Some("clone".to_string()),
            clean: None,
            build: "exit 1".to_string(),
            install: "exit 1".to_string(),
        };

        let mut ledger = HashMap::new();
        ledger.insert("clone".to_string(), false);

        let outcome = execute_action(&step, &facts, &ledger, &HashMap::new()).unwrap();
        assert_eq!(outcome.changed, Some(false));
    }

    #[test]
    fn build_action_rebuilds_when_source_changed() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());
        let marker = temp.path().join("built.txt");

        let mut step = command_step("unused");
        step.action = ActionConfig::Build {
            source_dir: temp.path().to_string_lossy().into_owned(),
            binary: "sh".to_string(),
            source_step: Some("clone".to_string()),
            clean: None,
            build: format!("touch '{}'", marker.display()),
            install: "true".to_string(),
        };

        let mut ledger = HashMap::new();
        ledger.insert("clone".to_string(), true);

        let outcome = execute_action(&step, &facts, &ledger, &HashMap::new()).unwrap();
        assert_eq!(outcome.changed, Some(true));
        assert!(marker.exists());
    }

    #[test]
    fn change_shell_unchanged_when_already_current() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut facts = facts_with_home(temp.path());
        // A user with no passwd entry, so the fact fallback is what gets
        // compared.
        facts.user = "rigup-no-such-user".to_string();
        facts.login_shell = resolve_executable("sh");

        let mut step = command_step("unused");
        step.action = ActionConfig::ChangeShell {
            shell: "sh".to_string(),
        };

        let outcome = execute_action(&step, &facts, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(outcome.changed, Some(false));
    }

    #[test]
    fn change_shell_trusts_passwd_over_stale_shell_variable() {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();
        let current = match crate::facts::login_shell_from_passwd(&user) {
            Some(shell) => shell,
            None => return, // no account entry to compare against
        };
        let name = match current.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => return,
        };
        let resolved = match resolve_executable(&name) {
            Some(p) => p,
            None => return,
        };
        if !same_file(&current, &resolved) {
            return;
        }

        let temp = tempfile::TempDir::new().unwrap();
        let mut facts = facts_with_home(temp.path());
        facts.user = user;
        // An earlier run already switched the shell; $SHELL still reports
        // whatever the session started with.
        facts.login_shell = Some(PathBuf::from("/bin/retired-shell"));

        let mut step = command_step("unused");
        step.action = ActionConfig::ChangeShell { shell: name };

        let outcome = execute_action(&step, &facts, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(outcome.changed, Some(false));
    }

    #[test]
    fn change_shell_missing_executable_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let facts = facts_with_home(temp.path());

        let mut step = command_step("unused");
        step.action = ActionConfig::ChangeShell {
            shell: "not-a-real-shell-binary".to_string(),
        };

        let err = execute_action(&step, &facts, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, RigupError::ExecutableMissing { .. }));
    }

    #[test]
    fn package_manager_commands() {
        assert_eq!(
            PackageManager::Apt.query_command("tmux"),
            "dpkg -s 'tmux'"
        );
        assert_eq!(
            PackageManager::Apt.install_command(&["tmux".into(), "zsh".into()]),
            "apt-get install -y tmux zsh"
        );
        assert_eq!(PackageManager::Dnf.query_command("zsh"), "rpm -q 'zsh'");
        assert_eq!(
            PackageManager::Pacman.install_command(&["git".into()]),
            "pacman -S --noconfirm git"
        );
    }
}
