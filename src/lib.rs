//! Rigup - idempotent workstation provisioning.
//!
//! Rigup executes a declarative plan of ordered steps against the local
//! host: installing packages, deploying dotfiles as symlinks, changing
//! the login shell, and building tools from source. Every step is gated
//! by a precondition and classifies whether it changed the host, so a
//! second run over a provisioned machine is a verifiable no-op.
//!
//! # Module layout
//!
//! - [`plan`] - plan file schema, loading, validation, interpolation
//! - [`facts`] - host facts resolved once per run
//! - [`provision`] - preconditions, actions, and the run loop
//! - [`dotfiles`] - repo sync and symlink deployment
//! - [`build`] - conditional source builds
//! - [`fetch`] - remote install-script fetching
//! - [`shell`] - command execution and executable lookup
//! - [`cli`] - argument parsing and subcommands
//! - [`ui`] - terminal output, spinners, prompts
//! - [`error`] - error types

pub mod build;
pub mod cli;
pub mod dotfiles;
pub mod error;
pub mod facts;
pub mod fetch;
pub mod plan;
pub mod provision;
pub mod shell;
pub mod ui;

pub use error::{Result, RigupError};
