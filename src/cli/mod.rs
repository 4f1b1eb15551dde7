//! Command-line interface: argument parsing and subcommand dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, FactsArgs, InitArgs, ListArgs, RunArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
