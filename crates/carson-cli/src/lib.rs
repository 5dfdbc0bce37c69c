//! Command-line surface for the Carson review gate and review sweep.

pub mod cli_args;
pub mod review_commands;

pub use cli_args::{Cli, CliCommand, GateArgs, ReviewCommand};
pub use review_commands::{build_cli_runtime, run_cli, run_cli_blocking};
