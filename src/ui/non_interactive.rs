//! Non-interactive UI for CI/headless environments.

use crate::error::{Result, RigupError};

use super::theme::RigupTheme;
use super::{OutputMode, SpinnerHandle, UserInterface};

/// UI implementation for non-interactive mode.
///
/// Prompts cannot be answered without a terminal, so a confirmation
/// request in this mode is an error. Callers that expect to run
/// headless pass `--yes` instead.
pub struct NonInteractiveUI {
    mode: OutputMode,
    theme: RigupTheme,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            theme: RigupTheme::plain(),
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool> {
        Err(RigupError::StepFailed {
            step: "confirm".to_string(),
            message: format!(
                "cannot prompt in non-interactive mode: {} (pass --yes to proceed)",
                question
            ),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_status() {
            println!("... {}", message);
        }
        Box::new(LogSpinner {
            show: self.mode.shows_status(),
        })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("{}", title);
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints terminal states as plain lines.
struct LogSpinner {
    show: bool,
}

impl SpinnerHandle for LogSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.show {
            println!("✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        if self.show {
            println!("○ {}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_fails_without_terminal() {
        let mut ui = NonInteractiveUI::new(OutputMode::Normal);
        let err = ui.confirm("proceed?", true).unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }

    #[test]
    fn reports_non_interactive() {
        let ui = NonInteractiveUI::new(OutputMode::Normal);
        assert!(!ui.is_interactive());
    }
}
