//! Changed-classification for plain command output.
//!
//! Structured actions report their own changed flag; this classifier
//! only covers `command` and `fetch_script` actions, where the captured
//! output is the only evidence available.

use crate::plan::ChangedWhen;

/// Decide whether a command action changed the host, from its output.
pub fn classify(rule: &ChangedWhen, output: &str) -> bool {
    match rule {
        ChangedWhen::WhenRun => true,
        ChangedWhen::Never => false,
        ChangedWhen::OutputContains { substring } => output.contains(substring.as_str()),
        ChangedWhen::OutputLacks { substring } => !output.contains(substring.as_str()),
    }
}
