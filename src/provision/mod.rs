//! Step execution: preconditions, actions, change classification, and
//! the run loop that ties them together.

pub mod action;
pub mod changed;
pub mod precondition;
pub mod runner;
pub mod step;

pub use action::{execute_action, ActionOutcome, PackageManager};
pub use precondition::{run_check, CheckResult};
pub use runner::{Provisioner, RunOptions, StepEvent};
pub use step::{display_title, format_duration, ExecutionResult, RunReport, StepStatus};
