//! Plan schema definitions.
//!
//! This module contains the struct definitions that map to the YAML plan
//! format. A plan is an ordered list of steps; declaration order is
//! execution order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root structure of a rigup.yml plan file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    /// Plan name (for display purposes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Global settings
    pub settings: Settings,

    /// Ordered step list; executed top to bottom
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Global settings that apply to every step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Environment variables exported to every step
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// Configuration for a single provisioning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name; must be unique within the plan
    pub name: String,

    /// Step title (for display)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What the step does
    pub action: ActionConfig,

    /// Skip the action entirely when this check is already satisfied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<Precondition>,

    /// How to decide whether a plain command actually changed the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_when: Option<ChangedWhen>,

    /// Run the action with elevated privileges
    #[serde(default, skip_serializing_if = "is_false")]
    pub elevated: bool,

    /// Record a failure but keep provisioning (best-effort steps)
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_failure: bool,

    /// Step-specific environment variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// The action a step performs.
///
/// Structured actions (clone, link, build, shell change, package install)
/// report their own changed-ness; only plain `command` actions fall back
/// to the step's [`ChangedWhen`] classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Run a shell command
    Command {
        /// Command line, run via `sh -c`
        command: String,
    },

    /// Install system packages through the host's package manager
    PackageInstall {
        /// Package names to install
        packages: Vec<String>,
    },

    /// Download a script and run it
    FetchScript {
        /// URL to fetch
        url: String,
        /// Expected SHA-256 of the script (hex); verified before running
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
        /// Interpreter to run the script with (default `sh`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interpreter: Option<String>,
    },

    /// Clone a git repository, or pull if it already exists
    CloneRepo {
        /// Repository URL
        url: String,
        /// Destination directory
        dest: String,
        /// Branch to clone
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },

    /// Symlink dotfiles from a source directory into a target directory
    LinkDotfiles {
        /// Source directory (a cloned dotfiles repo)
        source: String,
        /// Target directory (defaults to `${home}`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        /// Entry names to exclude (version-control metadata etc.)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
        /// Subdirectories linked as one whole-directory symlink
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        link_as_dir: Vec<String>,
    },

    /// Change the invoking user's default login shell
    ChangeShell {
        /// Shell executable name, resolved on PATH at execution time
        shell: String,
    },

    /// Build and install software from source when needed
    Build {
        /// Source checkout directory
        source_dir: String,
        /// Binary the build produces; its absence triggers a rebuild
        binary: String,
        /// Step whose changed flag marks the source as updated
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_step: Option<String>,
        /// Best-effort cleanup command; failure is ignored
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clean: Option<String>,
        /// Build command, run as the invoking user
        build: String,
        /// Install command, run elevated
        install: String,
    },
}

impl ActionConfig {
    /// Short kind name for display and JSON listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::PackageInstall { .. } => "package_install",
            Self::FetchScript { .. } => "fetch_script",
            Self::CloneRepo { .. } => "clone_repo",
            Self::LinkDotfiles { .. } => "link_dotfiles",
            Self::ChangeShell { .. } => "change_shell",
            Self::Build { .. } => "build",
        }
    }
}

/// Check gating whether a step's action runs at all.
///
/// A satisfied precondition means the host already looks provisioned and
/// the step is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Precondition {
    /// A file or directory exists (installation marker)
    FileExists {
        /// Path to check; `${fact}` interpolation applies
        path: String,
    },

    /// An executable is discoverable on PATH
    ExecutableOnPath {
        /// Executable name
        name: String,
    },

    /// A command exits zero
    CommandSucceeds {
        /// Command to run
        command: String,
    },

    /// A command's stdout contains a substring
    OutputContains {
        /// Command to run
        command: String,
        /// Substring expected in stdout
        substring: String,
    },

    /// A command's stdout matches a regular expression
    OutputMatches {
        /// Command to run
        command: String,
        /// Regex applied to stdout
        pattern: String,
    },

    /// An earlier step ran without changing the host
    StepUnchanged {
        /// Name of the earlier step
        step: String,
    },

    /// All checks must be satisfied
    All { checks: Vec<Precondition> },

    /// Any single satisfied check is sufficient
    Any { checks: Vec<Precondition> },
}

/// Classifier deciding whether a plain command action changed the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangedWhen {
    /// Running the action counts as a change (default)
    #[default]
    WhenRun,

    /// The action never counts as a change
    Never,

    /// Changed iff the captured output contains a substring
    OutputContains { substring: String },

    /// Changed iff the captured output lacks a substring
    /// (e.g. an installer printing "already installed" on reruns)
    OutputLacks { substring: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_minimal_yaml() {
        let yaml = r#"
steps:
  - name: hello
    action:
      type: command
      command: echo hello
"#;
        let plan: Plan = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].name, "hello");
        assert!(matches!(
            plan.steps[0].action,
            ActionConfig::Command { .. }
        ));
    }

    #[test]
    fn plan_preserves_step_order() {
        let yaml = r#"
steps:
  - name: first
    action: { type: command, command: "true" }
  - name: second
    action: { type: command, command: "true" }
  - name: third
    action: { type: command, command: "true" }
"#;
        let plan: Plan = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<_> = plan.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn step_defaults_are_conservative() {
        let yaml = r#"
name: pkg
action: { type: command, command: "true" }
"#;
        let step: StepConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!step.elevated);
        assert!(!step.allow_failure);
        assert!(step.precondition.is_none());
        assert!(step.changed_when.is_none());
    }

    #[test]
    fn precondition_parses_tagged_variants() {
        let yaml = r#"
type: all
checks:
  - type: file_exists
    path: "${home}/.oh-my-zsh"
  - type: executable_on_path
    name: zsh
"#;
        let check: Precondition = serde_yaml::from_str(yaml).unwrap();
        match check {
            Precondition::All { checks } => assert_eq!(checks.len(), 2),
            other => panic!("expected All, got {:?}", other),
        }
    }

    #[test]
    fn build_action_parses() {
        let yaml = r#"
type: build
source_dir: "${home}/src/neovim"
binary: nvim
source_step: neovim-clone
clean: make distclean
build: make CMAKE_BUILD_TYPE=Release
install: make install
"#;
        let action: ActionConfig = serde_yaml::from_str(yaml).unwrap();
        match action {
            ActionConfig::Build {
                binary,
                source_step,
                clean,
                ..
            } => {
                assert_eq!(binary, "nvim");
                assert_eq!(source_step.as_deref(), Some("neovim-clone"));
                assert_eq!(clean.as_deref(), Some("make distclean"));
            }
            other => panic!("expected Build, got {:?}", other),
        }
    }

    #[test]
    fn changed_when_default_is_when_run() {
        assert!(matches!(ChangedWhen::default(), ChangedWhen::WhenRun));
    }

    #[test]
    fn action_kind_names() {
        let action = ActionConfig::PackageInstall {
            packages: vec!["tmux".into()],
        };
        assert_eq!(action.kind(), "package_install");

        let action = ActionConfig::ChangeShell {
            shell: "zsh".into(),
        };
        assert_eq!(action.kind(), "change_shell");
    }

    #[test]
    fn plan_roundtrips_through_yaml() {
        let yaml = r#"
name: workstation
steps:
  - name: links
    action:
      type: link_dotfiles
      source: "${home}/.dotfiles"
      exclude: [".git"]
      link_as_dir: ["nvim"]
"#;
        let plan: Plan = serde_yaml::from_str(yaml).unwrap();
        let rendered = serde_yaml::to_string(&plan).unwrap();
        let reparsed: Plan = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.steps[0].name, "links");
        assert_eq!(reparsed.name.as_deref(), Some("workstation"));
    }
}
