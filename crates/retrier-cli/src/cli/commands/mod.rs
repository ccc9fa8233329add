//! CLI command handlers, one file per command.

mod config;
mod run;

pub use config::run_config;
pub use run::{run_command, CommandError};
