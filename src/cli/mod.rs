//! CLI module
//!
//! - serve: build the application and serve HTTP
//! - check: validate configuration and print a startup summary

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
