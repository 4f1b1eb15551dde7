//! Shell command execution and host lookups.

pub mod command;
pub mod lookup;

pub use command::{
    build_argv, execute, execute_check, execute_quiet, CommandOptions, CommandResult,
};
pub use lookup::{is_ci, is_elevated, resolve_executable};
