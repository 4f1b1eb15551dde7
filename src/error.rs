//! Error types for rigup operations.
//!
//! This module defines [`RigupError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `RigupError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `RigupError::Other`) for unexpected errors
//! - All errors should name the failing step or unmet condition

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rigup operations.
#[derive(Debug, Error)]
pub enum RigupError {
    /// Plan file not found at any expected location.
    #[error("Plan not found: {path}")]
    PlanNotFound { path: PathBuf },

    /// Failed to parse a plan file.
    #[error("Failed to parse plan at {path}: {message}")]
    PlanParseError { path: PathBuf, message: String },

    /// Invalid plan structure or values.
    #[error("Invalid plan: {message}")]
    PlanValidationError { message: String },

    /// Step execution failed fatally.
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// Shell command failed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// A required executable is not on PATH.
    #[error("Executable '{name}' not found on PATH ({context})")]
    ExecutableMissing { name: String, context: String },

    /// Symlink target directory does not exist.
    #[error("Link target directory missing: {path}")]
    LinkTargetMissing { path: PathBuf },

    /// Downloaded script did not match its declared checksum.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// Script download failed.
    #[error("Failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    /// An interpolation referenced a fact that does not exist.
    #[error("Unknown fact '${{{name}}}' in '{input}'")]
    UnknownFact { name: String, input: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for rigup operations.
pub type Result<T> = std::result::Result<T, RigupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_not_found_displays_path() {
        let err = RigupError::PlanNotFound {
            path: PathBuf::from("/home/dev/rigup.yml"),
        };
        assert!(err.to_string().contains("/home/dev/rigup.yml"));
    }

    #[test]
    fn plan_parse_error_displays_path_and_message() {
        let err = RigupError::PlanParseError {
            path: PathBuf::from("/rigup.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/rigup.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn step_failed_displays_step_and_message() {
        let err = RigupError::StepFailed {
            step: "default-shell".into(),
            message: "chsh exited with code 1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("default-shell"));
        assert!(msg.contains("chsh"));
    }

    #[test]
    fn command_failed_displays_command_and_code() {
        let err = RigupError::CommandFailed {
            command: "apt-get install tmux".into(),
            code: Some(100),
        };
        let msg = err.to_string();
        assert!(msg.contains("apt-get install tmux"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn executable_missing_displays_name_and_context() {
        let err = RigupError::ExecutableMissing {
            name: "zsh".into(),
            context: "after package install".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("zsh"));
        assert!(msg.contains("after package install"));
    }

    #[test]
    fn checksum_mismatch_displays_both_digests() {
        let err = RigupError::ChecksumMismatch {
            url: "https://example.com/install.sh".into(),
            expected: "abc".into(),
            actual: "def".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("def"));
    }

    #[test]
    fn unknown_fact_names_the_key() {
        let err = RigupError::UnknownFact {
            name: "hme".into(),
            input: "${hme}/.dotfiles".into(),
        };
        assert!(err.to_string().contains("${hme}"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: RigupError = io_err.into();
        assert!(matches!(err, RigupError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(RigupError::PlanValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
