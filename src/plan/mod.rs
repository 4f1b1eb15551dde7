//! Plan loading, parsing, and fact interpolation.

pub mod interpolation;
pub mod loader;
pub mod schema;

pub use interpolation::resolve_string;
pub use loader::{find_plan, load_plan, parse_plan, validate_plan, DEFAULT_PLAN_FILE};
pub use schema::{ActionConfig, ChangedWhen, Plan, Precondition, Settings, StepConfig};
