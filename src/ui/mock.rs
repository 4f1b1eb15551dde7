//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. Confirmations are answered from a
//! pre-configured response.

use crate::error::Result;

use super::{OutputMode, SpinnerHandle, UserInterface};

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    spinners: Vec<String>,
    confirmations: Vec<String>,
    confirm_response: Option<bool>,
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self {
            mode: OutputMode::Normal,
            ..Default::default()
        }
    }

    /// Answer every confirmation with `response`.
    pub fn with_confirm_response(mut self, response: bool) -> Self {
        self.confirm_response = Some(response);
        self
    }

    /// All plain messages shown.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All success messages shown.
    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    /// All warnings shown.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// All errors shown.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// All spinner messages started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// All confirmation questions asked.
    pub fn confirmations(&self) -> &[String] {
        &self.confirmations
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.confirmations.push(question.to_string());
        Ok(self.confirm_response.unwrap_or(default))
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner::default())
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner handle that records its terminal state.
#[derive(Debug, Default)]
pub struct MockSpinner {
    /// Final message, prefixed with its outcome.
    pub finished: Option<String>,
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.finished = Some(format!("success: {}", msg));
    }

    fn finish_error(&mut self, msg: &str) {
        self.finished = Some(format!("error: {}", msg));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finished = Some(format!("skipped: {}", msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_interactions() {
        let mut ui = MockUI::new();
        ui.message("starting");
        ui.success("done");
        ui.warning("careful");

        assert_eq!(ui.messages(), ["starting"]);
        assert_eq!(ui.successes(), ["done"]);
        assert_eq!(ui.warnings(), ["careful"]);
    }

    #[test]
    fn confirm_uses_configured_response() {
        let mut ui = MockUI::new().with_confirm_response(false);
        assert!(!ui.confirm("proceed?", true).unwrap());
        assert_eq!(ui.confirmations(), ["proceed?"]);
    }
}
