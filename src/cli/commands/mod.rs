//! CLI command implementations.

pub mod completions;
pub mod dispatcher;
pub mod facts;
pub mod init;
pub mod list;
pub mod run;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
