//! Command implementations for the extcompress CLI.

pub mod check;
pub mod detect;
pub mod filters;
pub mod run;

pub use check::cmd_check;
pub use detect::cmd_detect;
pub use filters::{FiltersOutput, cmd_filters};
pub use run::{Direction, RunOptions, cmd_run};
