//! Facts command implementation.
//!
//! The `rigup facts` command shows the host facts a run would resolve.

use crate::cli::args::FactsArgs;
use crate::error::Result;
use crate::facts::HostFacts;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The facts command implementation.
pub struct FactsCommand {
    args: FactsArgs,
}

impl FactsCommand {
    /// Create a new facts command.
    pub fn new(args: FactsArgs) -> Self {
        Self { args }
    }
}

impl Command for FactsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let facts = HostFacts::resolve()?;

        if self.args.json {
            ui.message(&serde_json::to_string_pretty(&facts).map_err(anyhow::Error::from)?);
            return Ok(CommandResult::success());
        }

        ui.message(&format!("home:  {}", facts.home.display()));
        ui.message(&format!("user:  {}", facts.user));
        ui.message(&format!(
            "shell: {}",
            facts
                .login_shell
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| "(unknown)".to_string())
        ));
        ui.message(&format!("root:  {}", facts.elevated));

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;

    #[test]
    fn prints_resolved_facts() {
        let cmd = FactsCommand::new(FactsArgs::default());
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(result.success);
        assert!(ui.messages().iter().any(|m| m.starts_with("home:")));
        assert!(ui.messages().iter().any(|m| m.starts_with("user:")));
    }

    #[test]
    fn json_output_is_parseable() {
        let cmd = FactsCommand::new(FactsArgs { json: true });
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        assert!(parsed["home"].is_string());
        assert!(parsed["user"].is_string());
    }
}
