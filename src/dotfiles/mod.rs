//! Dotfile repository syncing and symlink deployment.

pub mod linker;
pub mod repo;

pub use linker::{enumerate, link, LinkOutcome};
pub use repo::{clone_or_pull, SyncOutcome};
